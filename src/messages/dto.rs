use serde::{Deserialize, Serialize};

use super::repo_types::{Conversation, Message};

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
    pub portfolio_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub conversation_id: Option<i64>,
    pub recipient_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    #[serde(default)]
    pub triggered_by_voice: bool,
}

#[derive(Debug, Serialize)]
pub struct ConversationDetails {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Ancestor chain of a message, root first.
#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub message_id: i64,
    pub depth: usize,
    pub messages: Vec<Message>,
}
