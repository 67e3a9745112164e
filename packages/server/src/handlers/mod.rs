pub mod auth;
pub mod blobs;
pub mod chat;
pub mod history;
pub mod image;
pub mod recipe;

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;

use crate::error::AppError;

/// Build a download response with a safe `Content-Disposition` header.
pub(crate) fn attachment_response(
    body: Body,
    content_type: &str,
    filename: &str,
) -> Result<Response, AppError> {
    let safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | '\\' | '/'))
        .collect();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{safe}\""),
        )
        .header(header::CACHE_CONTROL, "private, no-store")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
