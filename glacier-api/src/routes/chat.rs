/// Team chat over REST
///
/// Writes are persisted first and then published to the team's realtime
/// room (see [`crate::realtime`]), so a sender may receive its own message
/// twice: once in the response and once as a `new_message` event.
///
/// # Endpoints
///
/// - `GET|POST /api/chat/teams/:teamId/messages`
/// - `PUT|DELETE /api/chat/messages/:messageId` - Sender only
/// - `GET /api/chat/unread-count`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
    realtime::ServerEvent,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use glacier_shared::{
    auth::middleware::AuthUser,
    models::{
        chat_message::{ChatMessage, ChatMessageType, ChatPage},
        team_member::TeamMember,
    },
};
use serde::Deserialize;
use serde_json::{json, Value};

const MAX_HISTORY_PAGE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub message_type: ChatMessageType,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub message: Option<String>,
}

fn message_text(raw: Option<&str>) -> ApiResult<&str> {
    raw.map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::invalid_field("message", "Message is required"))
}

async fn require_chat_member(state: &AppState, team_id: i32, user_id: i32) -> ApiResult<()> {
    if TeamMember::is_member_or_creator(&state.db, team_id, user_id).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden("You are not a member of this team"))
    }
}

/// Loads a message and checks the caller sent it
async fn own_message(state: &AppState, message_id: i32, user_id: i32, denied: &str) -> ApiResult<ChatMessage> {
    let message = ChatMessage::find_by_id(&state.db, message_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    if message.sender_id != user_id {
        return Err(ApiError::forbidden(denied));
    }

    Ok(message)
}

/// History page, oldest first within the page
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ChatPage>> {
    require_chat_member(&state, team_id, user.id).await?;

    let limit = query.limit.clamp(1, MAX_HISTORY_PAGE);
    let offset = query.offset.max(0);

    let page = ChatMessage::page(&state.db, team_id, limit, offset).await?;
    Ok(Json(page))
}

pub async fn post_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
    AppJson(req): AppJson<PostMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let text = message_text(req.message.as_deref())?;

    if matches!(&req.metadata, Some(m) if !m.is_object()) {
        return Err(ApiError::invalid_field("metadata", "metadata must be an object"));
    }

    require_chat_member(&state, team_id, user.id).await?;

    let message =
        ChatMessage::create(&state.db, team_id, user.id, text, req.message_type, req.metadata).await?;

    let delivered = state
        .hub
        .publish(team_id, ServerEvent::NewMessage(message.clone()));
    tracing::debug!(team_id, message_id = message.id, delivered, "Chat message sent");

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn edit_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(message_id): Path<i32>,
    AppJson(req): AppJson<EditMessageRequest>,
) -> ApiResult<Json<ChatMessage>> {
    let text = message_text(req.message.as_deref())?;
    own_message(&state, message_id, user.id, "You can only edit your own messages").await?;

    let message = ChatMessage::edit(&state.db, message_id, text)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    state
        .hub
        .publish(message.team_id, ServerEvent::MessageEdited(message.clone()));

    Ok(Json(message))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(message_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let message =
        own_message(&state, message_id, user.id, "You can only delete your own messages").await?;

    ChatMessage::delete(&state.db, message_id).await?;
    state
        .hub
        .publish(message.team_id, ServerEvent::MessageDeleted { id: message_id });

    Ok(Json(json!({ "message": "Message deleted successfully" })))
}

/// Read receipts are not tracked, so this is always zero
pub async fn unread_count() -> Json<Value> {
    Json(json!({ "unreadCount": 0 }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text() {
        assert_eq!(message_text(Some("  hi  ")).unwrap(), "hi");
        assert!(message_text(Some("   ")).is_err());
        assert!(message_text(None).is_err());
    }

    #[test]
    fn test_post_request_defaults_to_text() {
        let req: PostMessageRequest = serde_json::from_str(r#"{"message": "hello"}"#).unwrap();
        assert_eq!(req.message_type, ChatMessageType::Text);
        assert!(req.metadata.is_none());

        assert!(serde_json::from_str::<PostMessageRequest>(r#"{"message_type": "video"}"#).is_err());
    }
}
