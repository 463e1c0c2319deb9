/// Team chat messages
///
/// Messages are persisted here first; the API then fans them out to the
/// team's realtime room. Clients may see the same message from both the REST
/// response and the room event and de-duplicate by `id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "chat_message_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageType {
    Text,
    File,
    System,
}

impl Default for ChatMessageType {
    fn default() -> Self {
        ChatMessageType::Text
    }
}

/// Message joined with its sender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: i32,
    pub team_id: i32,
    pub sender_id: i32,
    pub message: String,
    pub message_type: ChatMessageType,
    pub metadata: Option<serde_json::Value>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sender_name: String,
    pub sender_email: String,
}

/// A page of history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    /// Oldest first
    pub messages: Vec<ChatMessage>,
    pub total: i64,
    pub has_more: bool,
}

// The CTE form lets insert/update return the joined row in one round trip.
const SELECT_JOINED: &str = r#"
    SELECT m.id, m.team_id, m.sender_id, m.message, m.message_type, m.metadata,
           m.is_edited, m.edited_at, m.created_at, m.updated_at,
           u.name AS sender_name, u.email AS sender_email
"#;

impl ChatMessage {
    pub async fn create(
        pool: &PgPool,
        team_id: i32,
        sender_id: i32,
        message: &str,
        message_type: ChatMessageType,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            r#"
            WITH m AS (
                INSERT INTO chat_messages (team_id, sender_id, message, message_type, metadata)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            {SELECT_JOINED}
            FROM m
            JOIN users u ON u.id = m.sender_id
            "#
        ))
        .bind(team_id)
        .bind(sender_id)
        .bind(message)
        .bind(message_type)
        .bind(metadata)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            r#"
            {SELECT_JOINED}
            FROM chat_messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// A page counted back from the newest message, returned oldest first
    pub async fn page(
        pool: &PgPool,
        team_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<ChatPage, sqlx::Error> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(&format!(
            r#"
            {SELECT_JOINED}
            FROM chat_messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.team_id = $1
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(team_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
        messages.reverse();

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE team_id = $1")
            .bind(team_id)
            .fetch_one(pool)
            .await?;

        let has_more = offset + (messages.len() as i64) < total;

        Ok(ChatPage {
            messages,
            total,
            has_more,
        })
    }

    /// Replaces the text and stamps `edited_at`
    pub async fn edit(pool: &PgPool, id: i32, message: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            r#"
            WITH m AS (
                UPDATE chat_messages
                SET message = $2, is_edited = TRUE, edited_at = NOW(), updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            {SELECT_JOINED}
            FROM m
            JOIN users u ON u.id = m.sender_id
            "#
        ))
        .bind(id)
        .bind(message)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_serializes_camel_case() {
        let page = ChatPage {
            messages: vec![],
            total: 3,
            has_more: true,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["hasMore"], true);
        assert_eq!(json["total"], 3);
    }

    #[test]
    fn test_message_type_defaults_to_text() {
        assert_eq!(ChatMessageType::default(), ChatMessageType::Text);
        let parsed: ChatMessageType = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(parsed, ChatMessageType::System);
    }
}
