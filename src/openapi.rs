use utoipa::OpenApi;

use crate::models::{
    ContractInfo, CreateTenantRequest, CreateTenantResponse, OpenPeriodRequest,
    OpenPeriodResponse, Pagination, Payment, PaymentMethod, PaymentStats, PaymentStatus,
    PaymentType, PaymentView, PhotoUploadResponse, RejectPaymentRequest, RejectedPayment, Room,
    RoomStatus, SortOrder, StatusColor, StatusFilter, Tenant, TenantDetailResponse,
    TenantLedgerResponse, TenantListItem, TenantPaymentSummary, TenantProfileResponse,
    TenantSummary, UnpaidMonth, UpdateTenantRequest,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kos API",
        version = "1.0.0",
        description = "Backend API untuk pengelolaan pembayaran kos"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "payments", description = "Tagihan dan bukti pembayaran penghuni"),
        (name = "tenants", description = "Profil penghuni"),
        (name = "admin", description = "Pengelolaan penghuni, kamar, dan tagihan")
    ),
    paths(
        // Payments
        crate::api::payments::list_payments,
        crate::api::payments::submit_payment,
        // Tenants
        crate::api::tenants::get_profile,
        crate::api::tenants::upload_own_photo,
        // Admin
        crate::api::admin::list_tenants,
        crate::api::admin::create_tenant,
        crate::api::admin::get_tenant,
        crate::api::admin::update_tenant,
        crate::api::admin::delete_tenant,
        crate::api::admin::upload_tenant_photo,
        crate::api::admin::list_available_rooms,
        crate::api::admin::open_billing_period,
        crate::api::admin::confirm_payment,
        crate::api::admin::reject_payment,
        crate::api::admin::list_reminders,
        crate::api::admin::mark_notified,
    ),
    components(
        schemas(
            // Payments
            Payment,
            PaymentView,
            PaymentStats,
            PaymentStatus,
            PaymentMethod,
            PaymentType,
            StatusColor,
            StatusFilter,
            SortOrder,
            Pagination,
            RejectPaymentRequest,
            OpenPeriodRequest,
            OpenPeriodResponse,
            // Tenants
            Tenant,
            TenantSummary,
            TenantLedgerResponse,
            TenantListItem,
            TenantPaymentSummary,
            TenantProfileResponse,
            ContractInfo,
            UnpaidMonth,
            RejectedPayment,
            TenantDetailResponse,
            CreateTenantRequest,
            UpdateTenantRequest,
            CreateTenantResponse,
            PhotoUploadResponse,
            // Rooms
            Room,
            RoomStatus,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_ledger_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/payments"));
        assert!(doc.paths.paths.contains_key("/api/v1/payments/{id}/submit"));
        assert!(doc.paths.paths.contains_key("/api/v1/admin/payments/{id}/reject"));
    }
}
