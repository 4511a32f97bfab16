use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::payment::{Payment, PaymentStats, PaymentView, Pagination};
use super::room::Room;
use crate::utils::validators::blank_as_none;

pub const ACTIVE_TENANT_STATUS: &str = "aktif";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
pub struct Tenant {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub name: String,
    pub contact: String,
    pub profile_photo: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_TENANT_STATUS
    }

    pub fn contract(&self) -> ContractInfo {
        ContractInfo {
            start_date: self.start_date,
            end_date: self.end_date,
            duration_months: self
                .end_date
                .map(|end| whole_months_between(self.start_date, end)),
            status: self.status.clone(),
            notes: self.notes.clone(),
        }
    }

    /// Only remotely hosted photos are exposed; anything else is a leftover local path.
    pub fn profile_photo_url(&self) -> Option<&str> {
        self.profile_photo
            .as_deref()
            .filter(|photo| photo.starts_with("http"))
    }
}

/// Number of complete months from `start` to `end`, in either order.
pub fn whole_months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let (from, to) = if start <= end { (start, end) } else { (end, start) };
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Overall payment standing of a tenant, shown in the admin tenant list.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
pub enum TenantPaymentSummary {
    Terlambat,
    Menunggu,
    Lunas,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantSummary {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub room: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantLedgerResponse {
    pub tenant: TenantSummary,
    pub payments: Vec<PaymentView>,
    pub stats: PaymentStats,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantListItem {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub phone: String,
    pub room_number: Option<String>,
    pub payment_status: TenantPaymentSummary,
    pub profile_photo_url: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub tenant_status: String,
}

/// Outstanding amount for one billing period.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct UnpaidMonth {
    /// `YYYY-MM`
    pub month: String,
    pub month_name: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct RejectedPayment {
    pub payment_id: Uuid,
    pub month: String,
    pub month_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ContractInfo {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub duration_months: Option<u32>,
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub profile_photo_url: Option<String>,
    pub room: Option<Room>,
    pub contract: ContractInfo,
    pub unpaid_count: usize,
    pub unpaid_months: Vec<UnpaidMonth>,
    pub rejected_payments: Vec<RejectedPayment>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantDetailResponse {
    pub tenant: Tenant,
    pub room: Option<Room>,
    pub payment_history: Vec<Payment>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub contact: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email)]
    pub email: Option<String>,
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub contact: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateTenantResponse {
    pub tenant: Tenant,
    /// Present only when a login account was created; shown once.
    pub temporary_password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PhotoUploadResponse {
    pub success: bool,
    pub profile_photo_url: String,
}
