/// Team-scoped labels and their assignment to tasks
///
/// Label names are unique per team (`labels_team_name_unique`). Assigning
/// labels to a task is a single `INSERT … SELECT` that both filters out
/// labels of other teams and skips pairs that already exist, so two
/// concurrent assignments of the same label cannot collide.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

/// Default label color (slate)
pub const DEFAULT_LABEL_COLOR: &str = "#64748b";

/// Label row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Label {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub color: String,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, team_id, name, color, created_by, created_at, updated_at";

impl Label {
    /// Creates a label
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the team already has a label with
    /// this name.
    pub async fn create(
        pool: &PgPool,
        team_id: i32,
        name: &str,
        color: &str,
        created_by: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Label>(&format!(
            r#"
            INSERT INTO labels (team_id, name, color, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(team_id)
        .bind(name)
        .bind(color)
        .bind(created_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(&format!("SELECT {COLUMNS} FROM labels WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Labels of a team ordered by name
    pub async fn list_for_team(pool: &PgPool, team_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(&format!(
            "SELECT {COLUMNS} FROM labels WHERE team_id = $1 ORDER BY name ASC"
        ))
        .bind(team_id)
        .fetch_all(pool)
        .await
    }

    /// Renames and/or recolors a label
    pub async fn update(
        pool: &PgPool,
        id: i32,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(&format!(
            r#"
            UPDATE labels
            SET name = COALESCE($2, name),
                color = COALESCE($3, color),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(color)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a label; its task assignments cascade
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM labels WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Attaches the given labels to a task
    ///
    /// Labels outside `team_id` are ignored. Returns how many of the requested
    /// labels belong to the team (already attached ones included), so callers
    /// can tell "nothing valid" apart from "nothing new".
    pub async fn assign_to_task(
        pool: &PgPool,
        task_id: i32,
        team_id: i32,
        label_ids: &[i32],
    ) -> Result<i64, sqlx::Error> {
        let valid: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM labels WHERE team_id = $1 AND id = ANY($2)",
        )
        .bind(team_id)
        .bind(label_ids)
        .fetch_one(pool)
        .await?;

        if valid == 0 {
            return Ok(0);
        }

        sqlx::query(
            r#"
            INSERT INTO task_labels (task_id, label_id)
            SELECT $1, l.id
            FROM labels l
            WHERE l.team_id = $2 AND l.id = ANY($3)
            ON CONFLICT ON CONSTRAINT task_labels_task_label_unique DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(team_id)
        .bind(label_ids)
        .execute(pool)
        .await?;

        Ok(valid)
    }

    /// Detaches a label from a task
    pub async fn remove_from_task(
        pool: &PgPool,
        task_id: i32,
        label_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_labels WHERE task_id = $1 AND label_id = $2")
            .bind(task_id)
            .bind(label_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Labels attached to a task, ordered by name
    pub async fn list_for_task(pool: &PgPool, task_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"
            SELECT l.id, l.team_id, l.name, l.color, l.created_by, l.created_at, l.updated_at
            FROM labels l
            JOIN task_labels tl ON tl.label_id = l.id
            WHERE tl.task_id = $1
            ORDER BY l.name ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}
