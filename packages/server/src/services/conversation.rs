use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use tracing::{info, instrument};

use super::ServiceError;
use super::message::MessageStore;
use super::ownership::require_owner;
use crate::entity::{conversation, message, user};

/// Title used when none could be generated.
pub const FALLBACK_TITLE: &str = "New Chat";

const MAX_TITLE_CHARS: usize = 256;

/// A conversation together with its messages, oldest first.
pub struct ConversationThread {
    pub conversation: conversation::Model,
    pub messages: Vec<message::Model>,
}

/// Owner-scoped chat threads of signed-in users.
#[derive(Clone)]
pub struct ConversationService {
    db: DatabaseConnection,
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    id: i32,
    lock: bool,
) -> Result<conversation::Model, ServiceError> {
    let mut query = conversation::Entity::find_by_id(id);
    if lock {
        query = query.lock(LockType::Update);
    }
    let found = query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Conversation {id} not found")))?;
    require_owner(found.user_id, user_id, ServiceError::AccessDenied)?;
    Ok(found)
}

impl ConversationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a conversation holding the first exchange.
    #[instrument(skip(self, first_message, title, reply))]
    pub async fn start(
        &self,
        user_id: i32,
        first_message: &str,
        title: &str,
        reply: &str,
    ) -> Result<conversation::Model, ServiceError> {
        let txn = self.db.begin().await?;

        user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {user_id} not found")))?;

        let now = Utc::now();
        let created = conversation::ActiveModel {
            user_id: Set(user_id),
            title: Set(title.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let messages = MessageStore::new(&txn);
        messages.create_user_message(created.id, first_message).await?;
        messages.create_assistant_message(created.id, reply).await?;

        txn.commit().await?;
        info!(conversation_id = created.id, "Conversation started");
        Ok(created)
    }

    /// Append one exchange to a conversation owned by `user_id`.
    #[instrument(skip(self, user_message, reply))]
    pub async fn append(
        &self,
        user_id: i32,
        id: i32,
        user_message: &str,
        reply: &str,
    ) -> Result<conversation::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let found = find_owned(&txn, user_id, id, true).await?;

        let messages = MessageStore::new(&txn);
        messages.create_user_message(id, user_message).await?;
        messages.create_assistant_message(id, reply).await?;

        let mut active: conversation::ActiveModel = found.into();
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Fails with `AccessDenied` when the conversation belongs to someone else.
    pub async fn find_for_user(
        &self,
        user_id: i32,
        id: i32,
    ) -> Result<conversation::Model, ServiceError> {
        find_owned(&self.db, user_id, id, false).await
    }

    pub async fn load(&self, user_id: i32, id: i32) -> Result<ConversationThread, ServiceError> {
        let conversation = self.find_for_user(user_id, id).await?;
        let messages = MessageStore::new(&self.db).list(id).await?;
        Ok(ConversationThread {
            conversation,
            messages,
        })
    }

    /// Most recently active first.
    pub async fn list_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<conversation::Model>, ServiceError> {
        Ok(conversation::Entity::find()
            .filter(conversation::Column::UserId.eq(user_id))
            .order_by_desc(conversation::Column::UpdatedAt)
            .order_by_desc(conversation::Column::Id)
            .all(&self.db)
            .await?)
    }

    #[instrument(skip(self, title))]
    pub async fn rename(
        &self,
        user_id: i32,
        id: i32,
        title: &str,
    ) -> Result<ConversationThread, ServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidInput("Title can't be blank".into()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ServiceError::InvalidInput(format!(
                "Title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }

        let txn = self.db.begin().await?;
        let found = find_owned(&txn, user_id, id, true).await?;
        let mut active: conversation::ActiveModel = found.into();
        active.title = Set(title.to_string());
        active.updated_at = Set(Utc::now());
        let conversation = active.update(&txn).await?;
        let messages = MessageStore::new(&txn).list(id).await?;
        txn.commit().await?;

        Ok(ConversationThread {
            conversation,
            messages,
        })
    }

    /// Remove a conversation and all of its messages.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i32, id: i32) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        find_owned(&txn, user_id, id, true).await?;

        let removed = MessageStore::new(&txn).delete_all(id).await?;
        conversation::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(conversation_id = id, messages = removed, "Conversation deleted");
        Ok(())
    }
}

/// First non-empty line of a generated title, without markdown or quotes.
pub fn normalize_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;
    let title = line
        .trim_start_matches('#')
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim();
    if title.is_empty() {
        return None;
    }
    Some(title.chars().take(MAX_TITLE_CHARS).collect())
}
