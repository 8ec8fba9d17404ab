use time::OffsetDateTime;

use super::dto::SendMessageRequest;
use super::repo_types::Message;
use crate::errors::{AppError, AppResult};

/// Longest allowed reply chain, counting the root.
pub const MAX_THREAD_DEPTH: usize = 32;
const MAX_CONTENT_LEN: usize = 10_000;

/// Where a new message goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Conversation(i64),
    Direct { recipient_id: i64 },
}

/// Trims the content and resolves the conversation/recipient XOR.
pub fn validate_send(req: &mut SendMessageRequest, sender_id: i64) -> AppResult<Target> {
    req.content = req.content.trim().to_string();
    if req.content.is_empty() {
        return Err(AppError::validation("Message content must not be empty"));
    }
    if req.content.chars().count() > MAX_CONTENT_LEN {
        return Err(AppError::validation(format!(
            "Message content must be at most {MAX_CONTENT_LEN} characters"
        )));
    }
    match (req.conversation_id, req.recipient_id) {
        (Some(id), None) => Ok(Target::Conversation(id)),
        (None, Some(recipient_id)) if recipient_id == sender_id => {
            Err(AppError::validation("You cannot message yourself"))
        }
        (None, Some(recipient_id)) => Ok(Target::Direct { recipient_id }),
        _ => Err(AppError::validation(
            "Provide exactly one of conversation_id or recipient_id",
        )),
    }
}

fn same_pair(parent: &Message, a: i64, b: i64) -> bool {
    parent.conversation_id.is_none()
        && matches!(
            (parent.sender_id, parent.recipient_id),
            (Some(s), Some(r)) if (s == a && r == b) || (s == b && r == a)
        )
}

/// A reply must point at an earlier message in the same conversation (or the same
/// direct pair) and keep the chain within `MAX_THREAD_DEPTH`.
///
/// `parent_chain` is the parent and its ancestors, nearest first, as returned by
/// a traversal capped at `MAX_THREAD_DEPTH`.
pub fn validate_reply(
    parent_chain: &[Message],
    target: Target,
    sender_id: i64,
    now: OffsetDateTime,
) -> AppResult<()> {
    let Some(parent) = parent_chain.first() else {
        return Err(AppError::validation("Reply target does not exist"));
    };
    if parent.created_at > now {
        return Err(AppError::validation("Reply target must be an earlier message"));
    }

    let in_scope = match target {
        Target::Conversation(id) => parent.conversation_id == Some(id),
        Target::Direct { recipient_id } => same_pair(parent, sender_id, recipient_id),
    };
    if !in_scope {
        return Err(AppError::validation(
            "Reply target belongs to a different conversation",
        ));
    }

    if parent_chain.len() + 1 > MAX_THREAD_DEPTH {
        return Err(AppError::validation(format!(
            "Reply thread cannot be deeper than {MAX_THREAD_DEPTH} messages"
        )));
    }
    Ok(())
}

/// Read access: participants of a direct message, or the owner of its conversation.
pub fn can_read(msg: &Message, user_id: i64, conversation_owner: Option<i64>) -> bool {
    match msg.conversation_id {
        Some(_) => conversation_owner == Some(user_id),
        None => msg.sender_id == Some(user_id) || msg.recipient_id == Some(user_id),
    }
}

/// Turns a nearest-first ancestor walk into a root-first thread, dropping any
/// link that does not point strictly backwards.
pub fn thread_from_chain(chain: Vec<Message>) -> Vec<Message> {
    let mut kept: Vec<Message> = Vec::with_capacity(chain.len());
    for msg in chain {
        if let Some(child) = kept.last() {
            if child.reply_to_id != Some(msg.id) || msg.id >= child.id {
                break;
            }
        }
        kept.push(msg);
    }
    kept.reverse();
    kept
}
