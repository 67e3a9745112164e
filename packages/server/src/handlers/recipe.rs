use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    response::Response,
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::MaybeAuthUser;
use crate::extractors::validated::AppJson;
use crate::models::recipe::{CreateRecipeRequest, CreateRecipeResponse};
use crate::services::history::NewHistoryEntry;
use crate::state::AppState;
use crate::utils::recipe::extract_title;

use super::attachment_response;

/// Generate a recipe. Signed-in callers also get it saved to their history.
#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    tag = "Recipes",
    operation_id = "createRecipe",
    request_body = CreateRecipeRequest,
    responses(
        (status = 200, description = "Generated recipe", body = CreateRecipeResponse),
        (status = 400, description = "Refused or invalid (INAPPROPRIATE_REQUEST, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Bad token (TOKEN_INVALID)", body = ErrorBody),
        (status = 503, description = "Generator unavailable (UPSTREAM_UNAVAILABLE)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller, payload), fields(user_id = ?caller.user_id()))]
pub async fn create_recipe(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRecipeRequest>,
) -> Result<Json<CreateRecipeResponse>, AppError> {
    let request = payload.validate()?;
    let result = state.recipes.create_recipe(&request).await?;

    let history_entry_id = match caller.user_id() {
        Some(user_id) => {
            let entry = state
                .history
                .save(
                    user_id,
                    NewHistoryEntry {
                        title: extract_title(&result.recipe_markdown),
                        content: result.content_without_download(),
                        recipe_file_id: Some(result.recipe_file_id),
                    },
                )
                .await?;
            Some(entry.id)
        }
        None => None,
    };

    Ok(Json(CreateRecipeResponse {
        text: result.full_text(),
        recipe_file_id: result.recipe_file_id,
        history_entry_id,
    }))
}

/// Download a stored recipe as markdown.
#[utoipa::path(
    get,
    path = "/api/v1/recipes/download/{id}",
    tag = "Recipes",
    operation_id = "downloadRecipe",
    params(("id" = i32, Path, description = "Recipe file ID")),
    responses(
        (status = 200, description = "Recipe markdown", content_type = "text/markdown", body = String),
        (status = 403, description = "Owned by someone else (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such recipe (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller))]
pub async fn download_recipe(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let file = state
        .recipes
        .download_recipe_file(id, caller.user_id())
        .await?;

    attachment_response(
        Body::from(file.content),
        "text/markdown; charset=utf-8",
        &format!("recipe-{id}.md"),
    )
}
