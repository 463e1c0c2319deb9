/// Task activity log
///
/// Append-only: rows are written by task and comment handlers and only ever
/// read back as a timeline. Nothing updates or deletes them except the task
/// cascade.
///
/// # Action types
///
/// - `created`: task created
/// - `updated`: title, description, priority or due date changed
/// - `status_changed`: status changed
/// - `assigned`: assignee changed
/// - `commented`: a comment was added

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

/// Activity row joined with the acting user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Activity {
    pub id: i32,
    pub task_id: i32,
    pub user_id: i32,
    pub action_type: String,
    pub field_changed: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
    pub user_email: String,
}

/// Input for a new activity row
#[derive(Debug, Clone, Default)]
pub struct NewActivity {
    pub task_id: i32,
    pub user_id: i32,
    pub action_type: &'static str,
    pub field_changed: Option<&'static str>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: Option<String>,
}

impl NewActivity {
    /// An activity without a field diff
    pub fn action(task_id: i32, user_id: i32, action_type: &'static str, description: String) -> Self {
        Self {
            task_id,
            user_id,
            action_type,
            description: Some(description),
            ..Default::default()
        }
    }

    /// A field change from `old` to `new`
    pub fn field_change(
        task_id: i32,
        user_id: i32,
        action_type: &'static str,
        field: &'static str,
        old: Option<String>,
        new: Option<String>,
    ) -> Self {
        Self {
            task_id,
            user_id,
            action_type,
            field_changed: Some(field),
            old_value: old,
            new_value: new,
            description: None,
        }
    }
}

impl Activity {
    /// Appends an activity row
    pub async fn log(pool: &PgPool, entry: NewActivity) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO task_activity
                (task_id, user_id, action_type, field_changed, old_value, new_value, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.task_id)
        .bind(entry.user_id)
        .bind(entry.action_type)
        .bind(entry.field_changed)
        .bind(entry.old_value)
        .bind(entry.new_value)
        .bind(entry.description)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Timeline of a task, newest first
    pub async fn list_for_task(pool: &PgPool, task_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Activity>(
            r#"
            SELECT a.id, a.task_id, a.user_id, a.action_type, a.field_changed,
                   a.old_value, a.new_value, a.description, a.created_at,
                   u.name AS user_name, u.email AS user_email
            FROM task_activity a
            JOIN users u ON u.id = a.user_id
            WHERE a.task_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_change_has_no_description() {
        let entry = NewActivity::field_change(
            1,
            2,
            "status_changed",
            "status",
            Some("pending".to_string()),
            Some("completed".to_string()),
        );
        assert_eq!(entry.field_changed, Some("status"));
        assert!(entry.description.is_none());

        let comment = NewActivity::action(1, 2, "commented", "Ada commented on the task".to_string());
        assert!(comment.field_changed.is_none());
        assert_eq!(comment.action_type, "commented");
    }
}
