/// Checklist items under a task

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subtask {
    pub id: i32,
    pub parent_task_id: i32,
    pub title: String,
    pub is_completed: bool,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, parent_task_id, title, is_completed, created_by, created_at, updated_at";

impl Subtask {
    pub async fn create(
        pool: &PgPool,
        parent_task_id: i32,
        title: &str,
        created_by: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(&format!(
            r#"
            INSERT INTO sub_tasks (parent_task_id, title, created_by)
            VALUES ($1, $2, $3)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(parent_task_id)
        .bind(title)
        .bind(created_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(&format!("SELECT {COLUMNS} FROM sub_tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Subtasks of a task in creation order
    pub async fn list_for_task(pool: &PgPool, task_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(&format!(
            "SELECT {COLUMNS} FROM sub_tasks WHERE parent_task_id = $1 ORDER BY id ASC"
        ))
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: i32,
        title: Option<&str>,
        is_completed: Option<bool>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(&format!(
            r#"
            UPDATE sub_tasks
            SET title = COALESCE($2, title),
                is_completed = COALESCE($3, is_completed),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(title)
        .bind(is_completed)
        .fetch_optional(pool)
        .await
    }

    /// Flips completion in place
    pub async fn toggle(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(&format!(
            r#"
            UPDATE sub_tasks
            SET is_completed = NOT is_completed, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sub_tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
