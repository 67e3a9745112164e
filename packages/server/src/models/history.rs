use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::history_entry;
use crate::error::AppError;
use crate::services::history::NewHistoryEntry;

/// Request body for saving a history entry.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SaveHistoryRequest {
    #[schema(example = "Lemon Garlic Butter Baked Fish")]
    pub title: String,
    /// Recipe markdown. A trailing download link is removed before saving.
    pub content: String,
    /// Stored recipe file this entry refers to.
    #[schema(example = 7)]
    pub recipe_file_id: Option<i32>,
}

impl SaveHistoryRequest {
    pub fn validate(self) -> Result<NewHistoryEntry, AppError> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > 256 {
            return Err(AppError::Validation(
                "Title must be 1-256 characters".into(),
            ));
        }
        if self.content.trim().is_empty() {
            return Err(AppError::Validation("Content must not be empty".into()));
        }
        Ok(NewHistoryEntry {
            title: title.to_string(),
            content: crate::utils::recipe::strip_download_suffix(&self.content)
                .trim()
                .to_string(),
            recipe_file_id: self.recipe_file_id,
        })
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HistoryEntryResponse {
    #[schema(example = 12)]
    pub id: i32,
    #[schema(example = "Lemon Garlic Butter Baked Fish")]
    pub title: String,
    pub content: String,
    #[schema(example = 7)]
    pub recipe_file_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<history_entry::Model> for HistoryEntryResponse {
    fn from(entry: history_entry::Model) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            content: entry.content,
            recipe_file_id: entry.recipe_file_id,
            created_at: entry.created_at,
        }
    }
}
