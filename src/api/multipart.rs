use axum::extract::multipart::{Field, Multipart, MultipartError};

use crate::error::{AppError, AppResult};
use crate::services::Evidence;

fn multipart_error(e: MultipartError) -> AppError {
    AppError::BadRequest(e.to_string())
}

pub(crate) async fn next_field(multipart: &mut Multipart) -> AppResult<Option<Field<'_>>> {
    multipart.next_field().await.map_err(multipart_error)
}

/// Reads a file field into memory. Format and size checks happen in the ledger.
pub(crate) async fn read_file(field: Field<'_>, default_name: &str) -> AppResult<Evidence> {
    let content_type = field
        .content_type()
        .ok_or_else(|| AppError::Validation("Content-Type berkas tidak ada".to_string()))?
        .to_string();
    let file_name = field.file_name().unwrap_or(default_name).to_string();
    let data = field.bytes().await.map_err(multipart_error)?;

    Ok(Evidence::new(file_name, content_type, data.to_vec()))
}

pub(crate) async fn read_text(field: Field<'_>) -> AppResult<String> {
    field.text().await.map_err(multipart_error)
}
