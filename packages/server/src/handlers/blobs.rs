use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use common::{BlobStore, ObjectKey, StorageError};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::validated::AppQuery;
use crate::models::image::BlobQuery;
use crate::services::image::IMAGE_CONTENT_TYPE;
use crate::state::AppState;

fn blob_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(_) => AppError::NotFound("Blob not found".into()),
        StorageError::InvalidKey(msg) => AppError::Validation(msg),
        StorageError::Signature(msg) => {
            tracing::debug!(%msg, "Rejected blob URL");
            AppError::PermissionDenied
        }
        other => AppError::Storage(other.to_string()),
    }
}

/// Serve a locally stored blob through a signed URL.
#[instrument(skip(state, query))]
pub async fn serve_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
    AppQuery(query): AppQuery<BlobQuery>,
) -> Result<Response, AppError> {
    let store = state
        .local_blobs
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Blob serving is disabled".into()))?;

    let key = ObjectKey::parse(&key).map_err(blob_error)?;
    store
        .verify(&key, query.expires, &query.signature)
        .map_err(blob_error)?;

    let reader = store.get_stream(&key).await.map_err(blob_error)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, IMAGE_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "private, max-age=300")
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
