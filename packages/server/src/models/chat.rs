use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::message::Role;
use crate::entity::{conversation, message};
use crate::services::chat::ChatTurn;
use crate::services::conversation::ConversationThread;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    #[schema(example = "How do I make a quick tomato sauce?")]
    pub message: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    /// Conversation the exchange was stored in. Absent for guests.
    #[schema(example = 3)]
    pub conversation_id: Option<i32>,
    /// Assistant reply. Recipe replies end with a download link.
    pub reply: String,
}

impl From<ChatTurn> for ChatResponse {
    fn from(turn: ChatTurn) -> Self {
        Self {
            conversation_id: turn.conversation_id,
            reply: turn.reply,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RenameConversationRequest {
    #[schema(example = "Weeknight pasta")]
    pub title: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub id: i32,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<message::Model> for MessageResponse {
    fn from(message: message::Model) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content,
            created_at: message.created_at,
        }
    }
}

/// A conversation without its messages.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ConversationSummary {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "Tomato sauce")]
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<conversation::Model> for ConversationSummary {
    fn from(conversation: conversation::Model) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConversationResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "Tomato sauce")]
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Oldest first.
    pub messages: Vec<MessageResponse>,
}

impl From<ConversationThread> for ConversationResponse {
    fn from(thread: ConversationThread) -> Self {
        Self {
            id: thread.conversation.id,
            title: thread.conversation.title,
            created_at: thread.conversation.created_at,
            updated_at: thread.conversation.updated_at,
            messages: thread.messages.into_iter().map(Into::into).collect(),
        }
    }
}
