use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Tidak terautentikasi")]
    Unauthorized,

    #[error("Akses ditolak")]
    Forbidden,

    #[error("Tidak ditemukan: {0}")]
    NotFound(String),

    #[error("Perubahan status tidak diizinkan: {0}")]
    InvalidTransition(String),

    #[error("Permintaan tidak valid: {0}")]
    BadRequest(String),

    #[error("Konflik: {0}")]
    Conflict(String),

    #[error("Validasi gagal: {0}")]
    Validation(String),

    #[error("Gagal mengunggah berkas: {0}")]
    Upload(String),

    #[error("Gagal menghapus berkas: {0}")]
    Delete(String),

    #[error("Kesalahan basis data: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Kesalahan JWT: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Kesalahan internal: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "ACCESS_DENIED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Upload(_) => "UPLOAD_ERROR",
            AppError::Delete(_) => "DELETE_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Jwt(_) => "INVALID_TOKEN",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Upload(msg) => {
                tracing::error!("Evidence upload failed: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Gagal mengunggah berkas, silakan coba lagi".to_string(),
                )
            }
            AppError::Delete(msg) => {
                tracing::error!("Asset delete failed: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Gagal menghapus berkas".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Kesalahan basis data".to_string(),
                )
            }
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Token tidak valid".to_string()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Kesalahan internal".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::InvalidTransition("x".into()), StatusCode::CONFLICT),
            (AppError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Upload("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_codes_are_distinct_per_kind() {
        assert_ne!(
            AppError::InvalidTransition("x".into()).code(),
            AppError::Conflict("x".into()).code()
        );
        assert_eq!(AppError::Forbidden.code(), "ACCESS_DENIED");
    }
}
