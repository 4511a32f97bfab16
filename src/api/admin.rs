use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::api::tenants::replace_tenant_photo;
use crate::error::{AppError, AppResult};
use crate::middleware::{require_admin, AppState, AuthUser};
use crate::models::{
    BillingPeriod, CreateTenantRequest, CreateTenantResponse, OpenPeriodRequest,
    OpenPeriodResponse, Payment, PhotoUploadResponse, RejectPaymentRequest, ReviewDecision, Room,
    RoomStatus, Tenant, TenantDetailResponse, TenantListItem, UpdateTenantRequest, UserRole,
    ACTIVE_TENANT_STATUS,
};
use crate::services::ledger::{self, LedgerClock};
use crate::services::tenancy::tenant_not_found;
use crate::services::AuthService;
use crate::utils::validators::{normalize_notes, sanitize_string, validate_phone};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route(
            "/tenants/:id",
            get(get_tenant).put(update_tenant).delete(delete_tenant),
        )
        .route("/tenants/:id/photo", post(upload_tenant_photo))
        .route("/rooms/available", get(list_available_rooms))
        .route("/billing-periods", post(open_billing_period))
        .route("/payments/reminders", get(list_reminders))
        .route("/payments/:id/confirm", put(confirm_payment))
        .route("/payments/:id/reject", put(reject_payment))
        .route("/payments/:id/notified", put(mark_notified))
}

#[derive(Debug, FromRow)]
struct TenantRow {
    #[sqlx(flatten)]
    tenant: Tenant,
    room_number: Option<String>,
    user_email: Option<String>,
}

async fn find_tenant(state: &AppState, id: Uuid) -> AppResult<Tenant> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(tenant_not_found)
}

/// Daftar penghuni beserta status pembayaran
#[utoipa::path(
    get,
    path = "/api/v1/admin/tenants",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Daftar penghuni", body = Vec<TenantListItem>),
        (status = 403, description = "Hanya admin")
    )
)]
pub async fn list_tenants(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<TenantListItem>>> {
    require_admin(&auth_user)?;

    let rows = sqlx::query_as::<_, TenantRow>(
        r#"
        SELECT t.*, r.number AS room_number, u.email AS user_email
        FROM tenants t
        LEFT JOIN rooms r ON r.id = t.room_id
        LEFT JOIN users u ON u.id = t.user_id
        ORDER BY t.name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let clock = LedgerClock::from_config(&state.config);
    let mut items = Vec::with_capacity(rows.len());

    for row in rows {
        let views = state.ledger.list_for_tenant(&row.tenant, clock).await?;
        let tenant = row.tenant;

        items.push(TenantListItem {
            id: tenant.id,
            profile_photo_url: tenant.profile_photo_url().map(str::to_string),
            username: row.user_email.unwrap_or_else(|| "-".to_string()),
            name: tenant.name,
            phone: tenant.contact,
            room_number: row.room_number,
            payment_status: ledger::summarize_tenant(&views),
            start_date: tenant.start_date,
            end_date: tenant.end_date,
            tenant_status: tenant.status,
        });
    }

    Ok(Json(items))
}

/// Tambah penghuni baru
#[utoipa::path(
    post,
    path = "/api/v1/admin/tenants",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = CreateTenantRequest,
    responses(
        (status = 200, description = "Penghuni dibuat", body = CreateTenantResponse),
        (status = 404, description = "Kamar tidak ditemukan"),
        (status = 409, description = "Kamar terisi atau email sudah dipakai"),
        (status = 422, description = "Data tidak valid")
    )
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateTenantRequest>,
) -> AppResult<Json<CreateTenantResponse>> {
    require_admin(&auth_user)?;

    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if !validate_phone(&payload.contact) {
        return Err(AppError::Validation("Format nomor telepon tidak valid".to_string()));
    }
    if payload.end_date <= payload.start_date {
        return Err(AppError::Validation(
            "Tanggal selesai harus setelah tanggal mulai".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1 FOR UPDATE")
        .bind(payload.room_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Kamar tidak ditemukan".to_string()))?;

    if room.status != RoomStatus::Available {
        return Err(AppError::Conflict(format!("Kamar {} tidak tersedia", room.number)));
    }

    let name = sanitize_string(&payload.name);
    let mut temporary_password = None;
    let mut user_id = None;

    if let Some(email) = payload.email.as_deref() {
        let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict("Email sudah digunakan".to_string()));
        }

        let password = AuthService::generate_temporary_password();
        let password_hash = AuthService::hash_password(&password)?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO users (name, email, password_hash, phone, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&name)
        .bind(email)
        .bind(&password_hash)
        .bind(&payload.contact)
        .bind(UserRole::Tenant)
        .fetch_one(&mut *tx)
        .await?;

        user_id = Some(id);
        temporary_password = Some(password);
    }

    let tenant = sqlx::query_as::<_, Tenant>(
        r#"
        INSERT INTO tenants (user_id, room_id, name, contact, start_date, end_date, status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(room.id)
    .bind(&name)
    .bind(payload.contact.trim())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(ACTIVE_TENANT_STATUS)
    .bind(normalize_notes(payload.notes.as_deref()))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE rooms SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(RoomStatus::Occupied)
        .bind(room.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(tenant_id = %tenant.id, room = %room.number, "Tenant created");

    Ok(Json(CreateTenantResponse {
        tenant,
        temporary_password,
    }))
}

/// Detail penghuni dan riwayat pembayaran
#[utoipa::path(
    get,
    path = "/api/v1/admin/tenants/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "ID penghuni")
    ),
    responses(
        (status = 200, description = "Detail penghuni", body = TenantDetailResponse),
        (status = 404, description = "Data penghuni tidak ditemukan")
    )
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TenantDetailResponse>> {
    require_admin(&auth_user)?;

    let tenant = find_tenant(&state, id).await?;
    let room = match tenant.room_id {
        Some(room_id) => state.ledger.tenancy().find_room(room_id).await?,
        None => None,
    };
    let payment_history = state.ledger.history_for_tenant(tenant.id).await?;

    Ok(Json(TenantDetailResponse {
        tenant,
        room,
        payment_history,
    }))
}

/// Ubah nama dan kontak penghuni
#[utoipa::path(
    put,
    path = "/api/v1/admin/tenants/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "ID penghuni")
    ),
    request_body = UpdateTenantRequest,
    responses(
        (status = 200, description = "Penghuni diperbarui", body = Tenant),
        (status = 404, description = "Data penghuni tidak ditemukan"),
        (status = 422, description = "Data tidak valid")
    )
)]
pub async fn update_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTenantRequest>,
) -> AppResult<Json<Tenant>> {
    require_admin(&auth_user)?;

    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if !validate_phone(&payload.contact) {
        return Err(AppError::Validation("Format nomor telepon tidak valid".to_string()));
    }

    let name = sanitize_string(&payload.name);
    let mut tx = state.pool.begin().await?;

    let tenant = sqlx::query_as::<_, Tenant>(
        r#"
        UPDATE tenants SET name = $1, contact = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(payload.contact.trim())
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(tenant_not_found)?;

    // the login account shows the same name
    if let Some(user_id) = tenant.user_id {
        sqlx::query("UPDATE users SET name = $1, updated_at = NOW() WHERE id = $2")
            .bind(&name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(tenant_id = %tenant.id, "Tenant updated");

    Ok(Json(tenant))
}

/// Hapus penghuni beserta tagihannya
#[utoipa::path(
    delete,
    path = "/api/v1/admin/tenants/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "ID penghuni")
    ),
    responses(
        (status = 200, description = "Penghuni dihapus"),
        (status = 404, description = "Data penghuni tidak ditemukan")
    )
)]
pub async fn delete_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    require_admin(&auth_user)?;

    let mut tx = state.pool.begin().await?;

    let tenant = sqlx::query_as::<_, Tenant>("DELETE FROM tenants WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(tenant_not_found)?;

    if let Some(room_id) = tenant.room_id {
        // the room frees up once nobody active lives there
        sqlx::query(
            r#"
            UPDATE rooms SET status = $1, updated_at = NOW()
            WHERE id = $2
              AND NOT EXISTS (SELECT 1 FROM tenants WHERE room_id = $2 AND status = $3)
            "#,
        )
        .bind(RoomStatus::Available)
        .bind(room_id)
        .bind(ACTIVE_TENANT_STATUS)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    if let Some(photo) = tenant.profile_photo_url() {
        if let Err(e) = state.ledger.evidence_store().delete(photo).await {
            tracing::warn!(tenant_id = %tenant.id, error = %e, "Failed to delete tenant photo");
        }
    }

    tracing::info!(tenant_id = %tenant.id, "Tenant deleted");

    Ok(Json(json!({ "success": true })))
}

/// Ganti foto profil penghuni
#[utoipa::path(
    post,
    path = "/api/v1/admin/tenants/{id}/photo",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "ID penghuni")
    ),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Foto diperbarui", body = PhotoUploadResponse),
        (status = 404, description = "Data penghuni tidak ditemukan"),
        (status = 422, description = "Format atau ukuran berkas tidak valid")
    )
)]
pub async fn upload_tenant_photo(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<PhotoUploadResponse>> {
    require_admin(&auth_user)?;

    let tenant = find_tenant(&state, id).await?;
    replace_tenant_photo(&state, &tenant, multipart).await
}

/// Kamar yang masih tersedia
#[utoipa::path(
    get,
    path = "/api/v1/admin/rooms/available",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Kamar tersedia", body = Vec<Room>)
    )
)]
pub async fn list_available_rooms(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<Room>>> {
    require_admin(&auth_user)?;

    let rooms = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE status = $1 ORDER BY number")
        .bind(RoomStatus::Available)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(rooms))
}

/// Buka periode tagihan bulanan
#[utoipa::path(
    post,
    path = "/api/v1/admin/billing-periods",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = OpenPeriodRequest,
    responses(
        (status = 200, description = "Tagihan sewa dibuat", body = OpenPeriodResponse),
        (status = 422, description = "Bulan tidak valid")
    )
)]
pub async fn open_billing_period(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<OpenPeriodRequest>,
) -> AppResult<Json<OpenPeriodResponse>> {
    require_admin(&auth_user)?;

    let period = BillingPeriod::new(payload.year, payload.month)?;
    let clock = LedgerClock::from_config(&state.config);
    let created = state.ledger.open_period(period, clock.now).await?;

    Ok(Json(OpenPeriodResponse {
        period: period.to_string(),
        due_date: period.due_date(),
        created,
    }))
}

/// Konfirmasi pembayaran
#[utoipa::path(
    put,
    path = "/api/v1/admin/payments/{id}/confirm",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "ID tagihan")
    ),
    responses(
        (status = 200, description = "Pembayaran dikonfirmasi", body = Payment),
        (status = 404, description = "Tagihan tidak ditemukan"),
        (status = 409, description = "Tagihan tidak sedang menunggu konfirmasi")
    )
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Payment>> {
    require_admin(&auth_user)?;

    let payment = state
        .ledger
        .review(id, ReviewDecision::Confirm, LedgerClock::from_config(&state.config))
        .await?;

    Ok(Json(payment))
}

/// Tolak pembayaran
#[utoipa::path(
    put,
    path = "/api/v1/admin/payments/{id}/reject",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "ID tagihan")
    ),
    request_body = RejectPaymentRequest,
    responses(
        (status = 200, description = "Pembayaran ditolak", body = Payment),
        (status = 404, description = "Tagihan tidak ditemukan"),
        (status = 409, description = "Tagihan tidak sedang menunggu konfirmasi"),
        (status = 422, description = "Alasan wajib diisi")
    )
)]
pub async fn reject_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectPaymentRequest>,
) -> AppResult<Json<Payment>> {
    require_admin(&auth_user)?;

    let payment = state
        .ledger
        .review(
            id,
            ReviewDecision::Reject {
                reason: payload.reason,
            },
            LedgerClock::from_config(&state.config),
        )
        .await?;

    Ok(Json(payment))
}

/// Tagihan terlambat yang perlu diingatkan
#[utoipa::path(
    get,
    path = "/api/v1/admin/payments/reminders",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tagihan yang perlu pengingat", body = Vec<Payment>)
    )
)]
pub async fn list_reminders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<Payment>>> {
    require_admin(&auth_user)?;

    let payments = state
        .ledger
        .reminders(LedgerClock::from_config(&state.config))
        .await?;

    Ok(Json(payments))
}

/// Tandai pengingat sudah dikirim
#[utoipa::path(
    put,
    path = "/api/v1/admin/payments/{id}/notified",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "ID tagihan")
    ),
    responses(
        (status = 200, description = "Pengingat dicatat", body = Payment),
        (status = 404, description = "Tagihan tidak ditemukan")
    )
)]
pub async fn mark_notified(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Payment>> {
    require_admin(&auth_user)?;

    let payment = state
        .ledger
        .mark_notified(id, LedgerClock::from_config(&state.config))
        .await?;

    Ok(Json(payment))
}
