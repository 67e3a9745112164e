use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set, sea_query::Expr, sea_query::LockType,
};

use crate::entity::{history_entry, recipe_file};

/// Outcome of a first-writer-wins owner attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The file was unowned and now belongs to the caller.
    Claimed,
    /// The file already had an owner; nothing changed.
    AlreadyOwned,
}

/// Persistence for stored recipe files.
pub struct RecipeFileStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> RecipeFileStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Store recipe text as a new unowned file.
    pub async fn create(&self, content: &str) -> Result<recipe_file::Model, DbErr> {
        recipe_file::ActiveModel {
            content: Set(content.to_string()),
            owner_id: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    pub async fn find(&self, id: i32) -> Result<Option<recipe_file::Model>, DbErr> {
        recipe_file::Entity::find_by_id(id).one(self.conn).await
    }

    /// Get a file with FOR UPDATE lock.
    pub async fn find_for_update(&self, id: i32) -> Result<Option<recipe_file::Model>, DbErr> {
        recipe_file::Entity::find_by_id(id)
            .lock(LockType::Update)
            .one(self.conn)
            .await
    }

    /// Set the owner only if none is recorded yet.
    pub async fn attach_owner(&self, id: i32, user_id: i32) -> Result<AttachOutcome, DbErr> {
        let result = recipe_file::Entity::update_many()
            .col_expr(recipe_file::Column::OwnerId, Expr::value(user_id))
            .filter(recipe_file::Column::Id.eq(id))
            .filter(recipe_file::Column::OwnerId.is_null())
            .exec(self.conn)
            .await?;

        Ok(if result.rows_affected > 0 {
            AttachOutcome::Claimed
        } else {
            AttachOutcome::AlreadyOwned
        })
    }

    /// Number of history entries pointing at the file.
    pub async fn reference_count(&self, id: i32) -> Result<u64, DbErr> {
        history_entry::Entity::find()
            .filter(history_entry::Column::RecipeFileId.eq(id))
            .count(self.conn)
            .await
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: i32) -> Result<bool, DbErr> {
        let result = recipe_file::Entity::delete_by_id(id).exec(self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
