//! Direct messages, the dialogue list and the blacklist.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use realty_shared::UserId;
use realty_store::{BlacklistEntry, BlockOutcome, Dialogue, Message, UserSummary};

use super::AppState;
use crate::auth::CurrentUser;
use crate::error::ServerError;

#[derive(Serialize)]
pub struct DialoguesResponse {
    dialogues: Vec<Dialogue>,
    unread_total: u64,
}

#[derive(Serialize)]
pub struct ConversationResponse {
    other_user: UserSummary,
    messages: Vec<Message>,
    marked_read: usize,
}

#[derive(Deserialize)]
pub struct SendRequest {
    content: String,
}

pub async fn dialogues(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<DialoguesResponse>, ServerError> {
    let db = state.db.lock().await;
    let dialogues = db.list_dialogues(current.user.id)?;
    let unread_total = db.unread_total(current.user.id)?;
    Ok(Json(DialoguesResponse {
        dialogues,
        unread_total,
    }))
}

pub async fn recipients(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<UserSummary>>, ServerError> {
    let users = state.db.lock().await.list_users_except(current.user.id)?;
    Ok(Json(users))
}

/// Full thread with `other`. Opening it marks what `other` sent as read;
/// the returned messages show the state before that.
pub async fn conversation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(other): Path<UserId>,
) -> Result<Json<ConversationResponse>, ServerError> {
    let db = state.db.lock().await;
    let other_user = UserSummary::from(&db.get_user(other)?);
    let messages = db.list_between(current.user.id, other)?;
    let marked_read = db.mark_read(current.user.id, other)?;
    Ok(Json(ConversationResponse {
        other_user,
        messages,
        marked_read,
    }))
}

pub async fn send(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(receiver): Path<UserId>,
    Json(req): Json<SendRequest>,
) -> Result<(StatusCode, Json<Message>), ServerError> {
    let message = state
        .db
        .lock()
        .await
        .send_message(current.user.id, receiver, &req.content)?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn blacklist(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<BlacklistEntry>>, ServerError> {
    let entries = state.db.lock().await.list_blocked(current.user.id)?;
    Ok(Json(entries))
}

pub async fn block(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(target): Path<UserId>,
) -> Result<(StatusCode, Json<BlockOutcome>), ServerError> {
    let outcome = state.db.lock().await.block_user(current.user.id, target)?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}
