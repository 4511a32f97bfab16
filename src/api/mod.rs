pub mod admin;
pub(crate) mod multipart;
pub mod payments;
pub mod tenants;

use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, Router};

use crate::middleware::{auth_middleware, AppState};

/// Multipart bodies carry a photo plus a few text fields.
const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/payments", payments::routes())
        .nest("/tenants", tenants::routes())
        .nest("/admin", admin::routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
}

/// The versioned API with state attached, as served under `/api/v1`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
