use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::entity::message::{self, Role};

/// Persistence for the messages of one conversation.
pub struct MessageStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> MessageStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn create_user_message(
        &self,
        conversation_id: i32,
        content: &str,
    ) -> Result<message::Model, DbErr> {
        self.create(conversation_id, Role::User, content).await
    }

    pub async fn create_assistant_message(
        &self,
        conversation_id: i32,
        content: &str,
    ) -> Result<message::Model, DbErr> {
        self.create(conversation_id, Role::Assistant, content).await
    }

    async fn create(
        &self,
        conversation_id: i32,
        role: Role,
        content: &str,
    ) -> Result<message::Model, DbErr> {
        message::ActiveModel {
            conversation_id: Set(conversation_id),
            role: Set(role),
            content: Set(content.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    /// Oldest first; ties keep insertion order.
    pub async fn list(&self, conversation_id: i32) -> Result<Vec<message::Model>, DbErr> {
        message::Entity::find()
            .filter(message::Column::ConversationId.eq(conversation_id))
            .order_by_asc(message::Column::CreatedAt)
            .order_by_asc(message::Column::Id)
            .all(self.conn)
            .await
    }

    pub async fn delete_all(&self, conversation_id: i32) -> Result<u64, DbErr> {
        let result = message::Entity::delete_many()
            .filter(message::Column::ConversationId.eq(conversation_id))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
