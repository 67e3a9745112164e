use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::validated::AppJson;
use crate::models::chat::{
    ChatRequest, ChatResponse, ConversationResponse, ConversationSummary,
    RenameConversationRequest,
};
use crate::state::AppState;

/// Ask the food assistant a question. Signed-in callers get a new conversation.
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "Chat",
    operation_id = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Refused or empty (INAPPROPRIATE_REQUEST, VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "Generator unavailable (UPSTREAM_UNAVAILABLE)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller, payload), fields(user_id = ?caller.user_id()))]
pub async fn chat(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let turn = state.chat.start(caller.user_id(), &payload.message).await?;
    Ok(Json(turn.into()))
}

/// Continue one of the caller's conversations.
#[utoipa::path(
    post,
    path = "/api/v1/chat/{id}/messages",
    tag = "Chat",
    operation_id = "continueConversation",
    params(("id" = i32, Path, description = "Conversation ID")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Refused or empty (INAPPROPRIATE_REQUEST, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Generator unavailable (UPSTREAM_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn continue_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let turn = state
        .chat
        .continue_conversation(auth_user.user_id, id, &payload.message)
        .await?;
    Ok(Json(turn.into()))
}

/// The caller's conversations, most recently active first.
#[utoipa::path(
    get,
    path = "/api/v1/chat",
    tag = "Chat",
    operation_id = "listConversations",
    responses(
        (status = 200, description = "Conversations", body = Vec<ConversationSummary>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_conversations(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    let conversations = state.conversations.list_for_user(auth_user.user_id).await?;
    Ok(Json(conversations.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/{id}",
    tag = "Chat",
    operation_id = "getConversation",
    params(("id" = i32, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Conversation with its messages", body = ConversationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ConversationResponse>, AppError> {
    let thread = state.conversations.load(auth_user.user_id, id).await?;
    Ok(Json(thread.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/chat/{id}",
    tag = "Chat",
    operation_id = "renameConversation",
    params(("id" = i32, Path, description = "Conversation ID")),
    request_body = RenameConversationRequest,
    responses(
        (status = 200, description = "Renamed conversation", body = ConversationResponse),
        (status = 400, description = "Blank title (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn rename_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<RenameConversationRequest>,
) -> Result<Json<ConversationResponse>, AppError> {
    let thread = state
        .conversations
        .rename(auth_user.user_id, id, &payload.title)
        .await?;
    Ok(Json(thread.into()))
}

/// Delete a conversation and its messages.
#[utoipa::path(
    delete,
    path = "/api/v1/chat/{id}",
    tag = "Chat",
    operation_id = "deleteConversation",
    params(("id" = i32, Path, description = "Conversation ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Belongs to another user (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.conversations.delete(auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
