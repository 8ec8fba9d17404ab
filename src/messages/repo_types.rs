use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "message_type", rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    User,
    Ai,
    System,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Conversation {
    pub id: i64,
    pub user_id: i64,
    pub portfolio_id: Option<i64>,
    pub title: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Conversation row for list views.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConversationSummary {
    pub id: i64,
    pub title: Option<String>,
    pub portfolio_id: Option<i64>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub conversation_id: Option<i64>,
    pub sender_id: Option<i64>,
    pub recipient_id: Option<i64>,
    pub content: String,
    pub message_type: MessageType,
    pub is_read: bool,
    pub reply_to_id: Option<i64>,
    pub triggered_by_voice: bool,
    pub ai_model: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Insert payload; `message_type` is always `user` for API-created messages.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Option<i64>,
    pub sender_id: i64,
    pub recipient_id: Option<i64>,
    pub content: String,
    pub reply_to_id: Option<i64>,
    pub triggered_by_voice: bool,
}
