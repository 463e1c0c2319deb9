/// In-app notifications
///
/// # Types
///
/// - `task_assigned`: a task was assigned to the recipient
/// - `comment_added`: someone commented on a task the recipient owns or works on
/// - `team_invite`: the recipient was invited to a team

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

pub const TYPE_TASK_ASSIGNED: &str = "task_assigned";
pub const TYPE_COMMENT_ADDED: &str = "comment_added";
pub const TYPE_TEAM_INVITE: &str = "team_invite";

/// Notification with the name of whoever triggered it
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_task_id: Option<i32>,
    pub related_team_id: Option<i32>,
    pub related_comment_id: Option<i32>,
    pub triggered_by: Option<i32>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub triggered_by_name: Option<String>,
    pub triggered_by_email: Option<String>,
}

/// Input for a new notification
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub user_id: i32,
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub related_task_id: Option<i32>,
    pub related_team_id: Option<i32>,
    pub related_comment_id: Option<i32>,
    pub triggered_by: Option<i32>,
}

impl Notification {
    pub async fn create(pool: &PgPool, data: NewNotification) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO notifications
                (user_id, type, title, message, related_task_id, related_team_id,
                 related_comment_id, triggered_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(data.user_id)
        .bind(data.kind)
        .bind(data.title)
        .bind(data.message)
        .bind(data.related_task_id)
        .bind(data.related_team_id)
        .bind(data.related_comment_id)
        .bind(data.triggered_by)
        .fetch_one(pool)
        .await
    }

    /// A page of the user's notifications, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT n.id, n.user_id, n.type, n.title, n.message, n.related_task_id,
                   n.related_team_id, n.related_comment_id, n.triggered_by, n.is_read,
                   n.created_at,
                   u.name AS triggered_by_name, u.email AS triggered_by_email
            FROM notifications n
            LEFT JOIN users u ON u.id = n.triggered_by
            WHERE n.user_id = $1
            ORDER BY n.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn unread_count(pool: &PgPool, user_id: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Marks one of the user's notifications read; false when not theirs
    pub async fn mark_read(pool: &PgPool, id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(pool: &PgPool, user_id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_read(pool: &PgPool, user_id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND is_read = TRUE")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
