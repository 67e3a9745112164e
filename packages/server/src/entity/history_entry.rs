use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub title: String,

    /// Snapshot of the recipe with any download link removed.
    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub recipe_file_id: Option<i32>,
    #[sea_orm(belongs_to, from = "recipe_file_id", to = "id")]
    pub recipe_file: BelongsTo<Option<super::recipe_file::Entity>>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
