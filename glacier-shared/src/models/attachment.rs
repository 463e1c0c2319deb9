/// Task attachments
///
/// The bytes live in the external attachment store; this table only keeps
/// the URL and the store's `public_id` needed to delete them again.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

/// Attachment row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: i32,
    pub task_id: i32,
    pub comment_id: Option<i32>,
    pub uploaded_by: i32,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_url: String,
    pub public_id: String,
    pub created_at: DateTime<Utc>,
}

/// Attachment with its uploader
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AttachmentWithUploader {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attachment: Attachment,
    pub uploader_name: String,
    pub uploader_email: String,
}

/// Input for recording an uploaded file
#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub task_id: i32,
    pub comment_id: Option<i32>,
    pub uploaded_by: i32,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_url: String,
    pub public_id: String,
}

impl Attachment {
    /// True for MIME types stored as images rather than raw files
    pub fn is_image(&self) -> bool {
        self.file_type.starts_with("image/")
    }

    pub async fn create(pool: &PgPool, data: CreateAttachment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO task_attachments
                (task_id, comment_id, uploaded_by, file_name, file_type, file_size, file_url, public_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, task_id, comment_id, uploaded_by, file_name, file_type,
                      file_size, file_url, public_id, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.comment_id)
        .bind(data.uploaded_by)
        .bind(data.file_name)
        .bind(data.file_type)
        .bind(data.file_size)
        .bind(data.file_url)
        .bind(data.public_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, comment_id, uploaded_by, file_name, file_type,
                   file_size, file_url, public_id, created_at
            FROM task_attachments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Attachments of a task, newest first
    pub async fn list_for_task(
        pool: &PgPool,
        task_id: i32,
    ) -> Result<Vec<AttachmentWithUploader>, sqlx::Error> {
        sqlx::query_as::<_, AttachmentWithUploader>(
            r#"
            SELECT a.id, a.task_id, a.comment_id, a.uploaded_by, a.file_name, a.file_type,
                   a.file_size, a.file_url, a.public_id, a.created_at,
                   u.name AS uploader_name, u.email AS uploader_email
            FROM task_attachments a
            JOIN users u ON u.id = a.uploaded_by
            WHERE a.task_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_attachments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
