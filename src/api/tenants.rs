use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::multipart::{next_field, read_file};
use crate::error::{AppError, AppResult};
use crate::middleware::{AppState, AuthUser};
use crate::models::{PhotoUploadResponse, Tenant, TenantProfileResponse};
use crate::services::evidence_store::{replace_asset, MAX_PROFILE_PHOTO_SIZE, PROFILE_PHOTO_FOLDER};
use crate::services::ledger;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_profile))
        .route("/me/photo", post(upload_own_photo))
}

/// Profil penghuni yang sedang login, beserta kontrak dan tunggakan
#[utoipa::path(
    get,
    path = "/api/v1/tenants/me",
    tag = "tenants",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profil penghuni", body = TenantProfileResponse),
        (status = 401, description = "Tidak terautentikasi"),
        (status = 404, description = "Data penghuni tidak ditemukan")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<TenantProfileResponse>> {
    let tenant = state.ledger.tenancy().resolve_tenant(auth_user.user_id).await?;

    let room = match tenant.room_id {
        Some(room_id) => state.ledger.tenancy().find_room(room_id).await?,
        None => None,
    };
    let payments = state.ledger.history_for_tenant(tenant.id).await?;

    Ok(Json(TenantProfileResponse {
        id: tenant.id,
        profile_photo_url: tenant.profile_photo_url().map(str::to_string),
        contract: tenant.contract(),
        unpaid_count: ledger::unpaid_count(&payments),
        unpaid_months: ledger::unpaid_months(&payments),
        rejected_payments: ledger::rejected_payments(&payments),
        name: tenant.name,
        contact: tenant.contact,
        room,
        updated_at: tenant.updated_at,
    }))
}

/// Ganti foto profil sendiri
#[utoipa::path(
    post,
    path = "/api/v1/tenants/me/photo",
    tag = "tenants",
    security(("bearer_auth" = [])),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Foto diperbarui", body = PhotoUploadResponse),
        (status = 404, description = "Data penghuni tidak ditemukan"),
        (status = 422, description = "Format atau ukuran berkas tidak valid")
    )
)]
pub async fn upload_own_photo(
    State(state): State<AppState>,
    auth_user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<PhotoUploadResponse>> {
    let tenant = state.ledger.tenancy().resolve_tenant(auth_user.user_id).await?;
    replace_tenant_photo(&state, &tenant, multipart).await
}

/// Uploads the `profile_photo` field, swaps it in and removes the old hosted photo.
pub(crate) async fn replace_tenant_photo(
    state: &AppState,
    tenant: &Tenant,
    mut multipart: Multipart,
) -> AppResult<Json<PhotoUploadResponse>> {
    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or("").to_string();

        if name == "profile_photo" {
            let photo = read_file(field, "photo.jpg").await?;
            photo.validate_image(MAX_PROFILE_PHOTO_SIZE)?;

            let pool = state.pool.clone();
            let tenant_id = tenant.id;
            let url = replace_asset(
                state.ledger.evidence_store(),
                tenant.profile_photo.as_deref(),
                photo,
                PROFILE_PHOTO_FOLDER,
                |url| async move {
                    sqlx::query(
                        "UPDATE tenants SET profile_photo = $1, updated_at = NOW() WHERE id = $2",
                    )
                    .bind(url)
                    .bind(tenant_id)
                    .execute(&pool)
                    .await?;
                    Ok::<(), AppError>(())
                },
            )
            .await?;

            tracing::info!(tenant_id = %tenant.id, "Profile photo replaced");

            return Ok(Json(PhotoUploadResponse {
                success: true,
                profile_photo_url: url,
            }));
        }
    }

    Err(AppError::Validation("Berkas profile_photo tidak ditemukan".to_string()))
}
