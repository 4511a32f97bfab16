use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::multipart::{next_field, read_file, read_text};
use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser};
use crate::models::{LedgerQuery, Payment, PaymentMethod, TenantLedgerResponse, TenantSummary};
use crate::services::ledger::{self, LedgerClock, DEFAULT_PER_PAGE};
use crate::services::EvidenceSubmission;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments))
        .route("/:id/submit", post(submit_payment))
}

/// Daftar tagihan milik penghuni
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(LedgerQuery),
    responses(
        (status = 200, description = "Tagihan, statistik, dan halaman", body = TenantLedgerResponse),
        (status = 401, description = "Tidak terautentikasi"),
        (status = 404, description = "Data penghuni tidak ditemukan")
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<TenantLedgerResponse>> {
    let tenant = state.ledger.tenancy().resolve_tenant(auth_user.user_id).await?;
    let clock = LedgerClock::from_config(&state.config);

    let views = state.ledger.list_for_tenant(&tenant, clock).await?;
    let stats = ledger::compute_stats(&views);

    let selected = ledger::filter_and_sort(
        &views,
        query.status.unwrap_or_default(),
        query.sort.unwrap_or_default(),
    );
    let (payments, pagination) = ledger::paginate(
        selected,
        query.page.unwrap_or(0),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    );

    let room = match tenant.room_id {
        Some(room_id) => state.ledger.tenancy().find_room(room_id).await?,
        None => None,
    };

    Ok(Json(TenantLedgerResponse {
        tenant: TenantSummary {
            id: tenant.id,
            name: tenant.name,
            contact: tenant.contact,
            room: room.map(|r| r.number),
        },
        payments,
        stats,
        pagination,
    }))
}

/// Kirim bukti pembayaran
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/submit",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "ID tagihan")
    ),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Bukti terkirim, menunggu konfirmasi", body = Payment),
        (status = 403, description = "Tagihan milik penghuni lain"),
        (status = 404, description = "Tagihan tidak ditemukan"),
        (status = 409, description = "Sudah dikonfirmasi atau sedang ditinjau"),
        (status = 422, description = "Metode, catatan, atau berkas tidak valid"),
        (status = 502, description = "Gagal mengunggah bukti")
    )
)]
pub async fn submit_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Payment>> {
    let tenant = state.ledger.tenancy().resolve_tenant(auth_user.user_id).await?;

    let mut method: Option<PaymentMethod> = None;
    let mut notes = None;
    let mut evidence = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "payment_method" => method = Some(read_text(field).await?.parse()?),
            "notes" => notes = Some(read_text(field).await?),
            "reference" => {
                let file = read_file(field, "bukti.jpg").await?;
                // an empty file input means no new evidence
                if !file.data.is_empty() {
                    evidence = Some(file);
                }
            }
            _ => {}
        }
    }

    let method = method
        .ok_or_else(|| AppError::Validation("Pilih metode pembayaran".to_string()))?;

    let payment = state
        .ledger
        .submit_evidence(
            &tenant,
            id,
            EvidenceSubmission {
                method,
                evidence,
                notes,
            },
            LedgerClock::from_config(&state.config),
        )
        .await?;

    Ok(Json(payment))
}
