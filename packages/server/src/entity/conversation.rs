use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A signed-in user's chat thread.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub title: String,

    #[sea_orm(has_many)]
    pub messages: HasMany<super::message::Entity>,

    pub created_at: DateTimeUtc,
    /// Bumped on every new message and on rename.
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
