use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::UserRole;
use crate::services::{AuthService, PaymentLedger};

/// Identity of the caller, passed explicitly into every ledger operation.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub ledger: PaymentLedger,
}

pub fn is_admin(role: &UserRole) -> bool {
    matches!(role, UserRole::Admin)
}

pub fn require_admin(auth_user: &AuthUser) -> AppResult<()> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn parse_role(role_str: &str) -> Option<UserRole> {
    match role_str {
        "tenant" => Some(UserRole::Tenant),
        "admin" => Some(UserRole::Admin),
        _ => None,
    }
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(state);
    next.run(request).await
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let app_state = parts
            .extensions
            .get::<AppState>()
            .cloned()
            .ok_or_else(|| reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"))?;

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Missing authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            reject(
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header format",
            )
        })?;

        let auth_service = AuthService::new(app_state.config);
        let claims = auth_service
            .verify_token(token)
            .map_err(|_| reject(StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        if claims.token_type != "access" {
            return Err(reject(StatusCode::UNAUTHORIZED, "Invalid token type"));
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| reject(StatusCode::UNAUTHORIZED, "Invalid user ID in token"))?;

        // unknown roles get no access rather than a default role
        let role = parse_role(&claims.role)
            .ok_or_else(|| reject(StatusCode::FORBIDDEN, "Unknown role in token"))?;

        Ok(AuthUser { user_id, role })
    }
}
