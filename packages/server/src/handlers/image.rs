use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::validated::{AppJson, AppQuery};
use crate::models::image::{FoodImageRequest, FoodImageResponse, GalleryItem};
use crate::models::shared::{PageQuery, PageResponse};
use crate::state::AppState;

use super::attachment_response;

/// Generate a food image. Signed-in callers keep it in their gallery.
#[utoipa::path(
    post,
    path = "/api/v1/food-images",
    tag = "Images",
    operation_id = "generateFoodImage",
    request_body = FoodImageRequest,
    responses(
        (status = 200, description = "Image URL", body = FoodImageResponse),
        (status = 400, description = "Refused or invalid (INAPPROPRIATE_REQUEST, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Bad token (TOKEN_INVALID)", body = ErrorBody),
        (status = 502, description = "Upload failed (STORAGE_ERROR)", body = ErrorBody),
        (status = 503, description = "Generator unavailable (UPSTREAM_UNAVAILABLE)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller, payload), fields(user_id = ?caller.user_id()))]
pub async fn generate_image(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<FoodImageRequest>,
) -> Result<Json<FoodImageResponse>, AppError> {
    let url = state
        .images
        .generate_and_persist(caller.user_id(), &payload.into())
        .await?;
    Ok(Json(FoodImageResponse { url }))
}

/// One page of the caller's gallery, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/me/images",
    tag = "Images",
    operation_id = "listMyImages",
    params(PageQuery),
    responses(
        (status = 200, description = "Gallery page", body = PageResponse<GalleryItem>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_images(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<PageResponse<GalleryItem>>, AppError> {
    let request = query.to_request(state.images.default_page_size());
    let page = state.images.get_page(auth_user.user_id, request).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/images/{id}/download",
    tag = "Images",
    operation_id = "downloadMyImage",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "PNG bytes", content_type = "image/png"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let content = state
        .images
        .load_content_for_user(id, auth_user.user_id)
        .await?;
    attachment_response(
        Body::from_stream(ReaderStream::new(content.reader)),
        content.content_type,
        &content.filename,
    )
}

#[utoipa::path(
    delete,
    path = "/api/v1/me/images/{id}",
    tag = "Images",
    operation_id = "deleteMyImage",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Blob delete failed; image kept (STORAGE_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.images.delete_for_user(id, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
