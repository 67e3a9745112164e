use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,

    #[sea_orm(has_many)]
    pub history: HasMany<super::history_entry::Entity>,

    #[sea_orm(has_many)]
    pub images: HasMany<super::image::Entity>,

    #[sea_orm(has_many)]
    pub recipe_files: HasMany<super::recipe_file::Entity>,

    #[sea_orm(has_many)]
    pub conversations: HasMany<super::conversation::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
