use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::validated::{AppJson, AppQuery};
use crate::models::history::{HistoryEntryResponse, SaveHistoryRequest};
use crate::models::shared::{PageQuery, PageResponse};
use crate::state::AppState;

use super::attachment_response;

/// Save a recipe to the caller's history.
#[utoipa::path(
    post,
    path = "/api/v1/recipes/history",
    tag = "History",
    operation_id = "saveHistoryEntry",
    request_body = SaveHistoryRequest,
    responses(
        (status = 201, description = "Entry saved", body = HistoryEntryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe file not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn save_entry(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SaveHistoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = payload.validate()?;
    let saved = state.history.save(auth_user.user_id, entry).await?;
    Ok((StatusCode::CREATED, Json(HistoryEntryResponse::from(saved))))
}

/// The caller's full history, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/recipes/history",
    tag = "History",
    operation_id = "listHistory",
    responses(
        (status = 200, description = "History entries", body = Vec<HistoryEntryResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_entries(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntryResponse>>, AppError> {
    let entries = state.history.list_for_user(auth_user.user_id).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// One page of the caller's history, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/recipes/history/paged",
    tag = "History",
    operation_id = "listHistoryPaged",
    params(PageQuery),
    responses(
        (status = 200, description = "History page", body = PageResponse<HistoryEntryResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_entries_paged(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<PageResponse<HistoryEntryResponse>>, AppError> {
    let request = query.to_request(state.history.default_page_size());
    let page = state.history.get_page(auth_user.user_id, request).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/history/{id}",
    tag = "History",
    operation_id = "getHistoryEntry",
    params(("id" = i32, Path, description = "History entry ID")),
    responses(
        (status = 200, description = "History entry", body = HistoryEntryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_entry(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<HistoryEntryResponse>, AppError> {
    let entry = state.history.find_for_user(auth_user.user_id, id).await?;
    Ok(Json(entry.into()))
}

/// Download the saved snapshot of a history entry as markdown.
#[utoipa::path(
    get,
    path = "/api/v1/recipes/history/{id}/download",
    tag = "History",
    operation_id = "downloadHistoryEntry",
    params(("id" = i32, Path, description = "History entry ID")),
    responses(
        (status = 200, description = "Recipe markdown", content_type = "text/markdown", body = String),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_entry(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let entry = state.history.find_for_user(auth_user.user_id, id).await?;
    attachment_response(
        Body::from(entry.content),
        "text/markdown; charset=utf-8",
        &format!("recipe-history-{id}.md"),
    )
}

/// Delete a history entry. Its recipe file goes too once nothing else refers to it.
#[utoipa::path(
    delete,
    path = "/api/v1/recipes/history/{id}",
    tag = "History",
    operation_id = "deleteHistoryEntry",
    params(("id" = i32, Path, description = "History entry ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_entry(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state
        .history
        .delete_from_history(auth_user.user_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
