use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A generated recipe kept independently of any history entry.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_file")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Markdown body. Never updated after insert.
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// NULL until the first history entry claims the file; never changes afterwards.
    pub owner_id: Option<i32>,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: BelongsTo<Option<super::user::Entity>>,

    #[sea_orm(has_many)]
    pub history: HasMany<super::history_entry::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
