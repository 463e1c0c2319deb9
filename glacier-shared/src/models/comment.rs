/// Task comments

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

/// Comment row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i32,
    pub task_id: i32,
    pub user_id: i32,
    pub comment: String,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment with its author
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: Comment,
    pub user_name: String,
    pub user_email: String,
}

impl Comment {
    pub async fn create(
        pool: &PgPool,
        task_id: i32,
        user_id: i32,
        body: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO task_comments (task_id, user_id, comment)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, user_id, comment, is_edited, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(pool)
        .await
    }

    /// Comments on a task, oldest first
    pub async fn list_for_task(
        pool: &PgPool,
        task_id: i32,
    ) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.task_id, c.user_id, c.comment, c.is_edited, c.created_at, c.updated_at,
                   u.name AS user_name, u.email AS user_email
            FROM task_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.task_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Rewrites a comment owned by `user_id` and marks it edited
    ///
    /// `None` when the comment does not exist or belongs to someone else.
    pub async fn update_owned(
        pool: &PgPool,
        id: i32,
        user_id: i32,
        body: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE task_comments
            SET comment = $3, is_edited = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, task_id, user_id, comment, is_edited, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(body)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a comment owned by `user_id`
    pub async fn delete_owned(pool: &PgPool, id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_comments WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
