use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::dto::{ConversationDetails, CreateConversationRequest, SendMessageRequest, ThreadResponse};
use super::repo_types::{Conversation, ConversationSummary, Message, NewMessage};
use super::services::{
    can_read, thread_from_chain, validate_reply, validate_send, Target, MAX_THREAD_DEPTH,
};
use crate::{
    auth::{CurrentUser, User},
    errors::{AppError, AppResult},
    portfolios::{repo_types::Portfolio, services::ensure_viewable},
    state::AppState,
};

const CONVERSATION_NOT_FOUND: &str = "Conversation not found";
const MESSAGE_NOT_FOUND: &str = "Message not found";

pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/conversations", post(create_conversation).get(list_conversations))
        .route("/conversations/:id", get(get_conversation))
        .route("/messages", post(send_message))
        .route("/messages/inbox", get(inbox))
        .route("/messages/:id/thread", get(thread))
        .route("/messages/:id/read", post(mark_read))
}

async fn owned_conversation(state: &AppState, user_id: i64, id: i64) -> AppResult<Conversation> {
    Conversation::find_by_id(&state.db, id)
        .await?
        .filter(|c| c.user_id == user_id)
        .ok_or_else(|| AppError::not_found(CONVERSATION_NOT_FOUND))
}

/// The message if `user_id` may read it; otherwise it does not exist.
async fn readable_message(state: &AppState, user_id: i64, id: i64) -> AppResult<Message> {
    let msg = Message::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(MESSAGE_NOT_FOUND))?;
    let owner = match msg.conversation_id {
        Some(cid) => Conversation::find_by_id(&state.db, cid).await?.map(|c| c.user_id),
        None => None,
    };
    if !can_read(&msg, user_id, owner) {
        return Err(AppError::not_found(MESSAGE_NOT_FOUND));
    }
    Ok(msg)
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateConversationRequest>,
) -> AppResult<(StatusCode, Json<Conversation>)> {
    if let Some(pid) = payload.portfolio_id {
        ensure_viewable(Some(&user), Portfolio::find_by_id(&state.db, pid).await?)?;
    }
    let title = payload.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let conversation = Conversation::create(&state.db, user.id, title, payload.portfolio_id).await?;
    info!(conversation_id = conversation.id, "conversation started");
    Ok((StatusCode::CREATED, Json(conversation)))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<ConversationSummary>>> {
    Ok(Json(Conversation::list_by_user(&state.db, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ConversationDetails>> {
    let conversation = owned_conversation(&state, user.id, id).await?;
    let messages = Message::list_in_conversation(&state.db, id).await?;
    Ok(Json(ConversationDetails {
        conversation,
        messages,
    }))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut payload): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let target = validate_send(&mut payload, user.id)?;
    match target {
        Target::Conversation(id) => {
            owned_conversation(&state, user.id, id).await?;
        }
        Target::Direct { recipient_id } => {
            User::find_by_id(&state.db, recipient_id)
                .await?
                .filter(|u| u.is_active)
                .ok_or_else(|| AppError::not_found("Recipient not found"))?;
        }
    }

    if let Some(parent_id) = payload.reply_to_id {
        let chain = Message::ancestors(&state.db, parent_id, MAX_THREAD_DEPTH).await?;
        validate_reply(&chain, target, user.id, OffsetDateTime::now_utc())?;
    }

    let (conversation_id, recipient_id) = match target {
        Target::Conversation(id) => (Some(id), None),
        Target::Direct { recipient_id } => (None, Some(recipient_id)),
    };
    let message = Message::create(
        &state.db,
        &NewMessage {
            conversation_id,
            sender_id: user.id,
            recipient_id,
            content: payload.content,
            reply_to_id: payload.reply_to_id,
            triggered_by_voice: payload.triggered_by_voice,
        },
    )
    .await?;
    if let Some(id) = conversation_id {
        Conversation::touch(&state.db, id).await?;
    }

    info!(message_id = message.id, ?conversation_id, ?recipient_id, "message sent");
    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn inbox(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(Message::inbox(&state.db, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn thread(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ThreadResponse>> {
    readable_message(&state, user.id, id).await?;
    let messages = thread_from_chain(Message::ancestors(&state.db, id, MAX_THREAD_DEPTH).await?);
    Ok(Json(ThreadResponse {
        message_id: id,
        depth: messages.len(),
        messages,
    }))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Message>> {
    let msg = readable_message(&state, user.id, id).await?;
    if msg.recipient_id != Some(user.id) {
        return Err(AppError::forbidden("Only the recipient can mark a message as read"));
    }
    Ok(Json(Message::mark_read(&state.db, id).await?))
}
