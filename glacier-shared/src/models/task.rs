/// Task model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id SERIAL PRIMARY KEY,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'pending',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     team_id INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     assigned_to INTEGER REFERENCES users(id) ON DELETE SET NULL,
///     created_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Status Lifecycle
///
/// ```text
/// pending ⇄ in_progress ⇄ completed
/// ```
///
/// Any transition is allowed; the status is a label, not a state machine.
///
/// # Filters
///
/// Optional filters are passed as nullable binds and resolved in SQL with
/// `($n IS NULL OR column = $n)`, so every listing is a single prepared
/// statement regardless of which filters are present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(()),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(()),
        }
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub team_id: i32,
    pub assigned_to: Option<i32>,
    pub created_by: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task joined with the names shown next to it in listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskWithNames {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,
    pub team_name: Option<String>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
    pub creator_name: Option<String>,
}

/// Upcoming or overdue task for the reminders panel
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Reminder {
    pub id: i32,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub team_name: Option<String>,
}

/// One line of a digest email
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DigestItem {
    pub id: i32,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

/// Optional listing filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<i32>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub team_id: i32,
    pub assigned_to: Option<i32>,
    pub created_by: i32,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update
///
/// The outer `Option` of `assigned_to` and `due_date` means "leave as is";
/// `Some(None)` clears the column.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Option<i32>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.due_date.is_none()
    }
}

const SELECT_WITH_NAMES: &str = r#"
    SELECT t.id, t.title, t.description, t.status, t.priority, t.team_id,
           t.assigned_to, t.created_by, t.due_date, t.created_at, t.updated_at,
           tm.name AS team_name,
           assignee.name AS assignee_name,
           assignee.email AS assignee_email,
           creator.name AS creator_name
    FROM tasks t
    LEFT JOIN teams tm ON tm.id = t.team_id
    LEFT JOIN users assignee ON assignee.id = t.assigned_to
    LEFT JOIN users creator ON creator.id = t.created_by
"#;

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, priority, team_id, assigned_to, created_by, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, description, status, priority, team_id,
                      assigned_to, created_by, due_date, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.team_id)
        .bind(data.assigned_to)
        .bind(data.created_by)
        .bind(data.due_date)
        .fetch_one(pool)
        .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, priority, team_id,
                   assigned_to, created_by, due_date, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a task with team, assignee and creator names
    pub async fn find_with_names(
        pool: &PgPool,
        id: i32,
    ) -> Result<Option<TaskWithNames>, sqlx::Error> {
        sqlx::query_as::<_, TaskWithNames>(&format!("{SELECT_WITH_NAMES} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Tasks of a team, newest first
    pub async fn list_for_team(
        pool: &PgPool,
        team_id: i32,
        filter: &TaskFilter,
    ) -> Result<Vec<TaskWithNames>, sqlx::Error> {
        sqlx::query_as::<_, TaskWithNames>(&format!(
            r#"{SELECT_WITH_NAMES}
            WHERE t.team_id = $1
              AND ($2::task_status IS NULL OR t.status = $2)
              AND ($3::task_priority IS NULL OR t.priority = $3)
              AND ($4::integer IS NULL OR t.assigned_to = $4)
            ORDER BY t.created_at DESC
            "#
        ))
        .bind(team_id)
        .bind(filter.status)
        .bind(filter.priority)
        .bind(filter.assigned_to)
        .fetch_all(pool)
        .await
    }

    /// Tasks assigned to a user across all teams, newest first
    pub async fn list_assigned(
        pool: &PgPool,
        user_id: i32,
        filter: &TaskFilter,
    ) -> Result<Vec<TaskWithNames>, sqlx::Error> {
        sqlx::query_as::<_, TaskWithNames>(&format!(
            r#"{SELECT_WITH_NAMES}
            WHERE t.assigned_to = $1
              AND ($2::task_status IS NULL OR t.status = $2)
              AND ($3::task_priority IS NULL OR t.priority = $3)
            ORDER BY t.created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.priority)
        .fetch_all(pool)
        .await
    }

    /// Open tasks assigned to a user that are overdue or due within three days
    pub async fn reminders(pool: &PgPool, user_id: i32) -> Result<Vec<Reminder>, sqlx::Error> {
        sqlx::query_as::<_, Reminder>(
            r#"
            SELECT t.id, t.title, t.status, t.priority, t.due_date, tm.name AS team_name
            FROM tasks t
            LEFT JOIN teams tm ON tm.id = t.team_id
            WHERE t.assigned_to = $1
              AND t.status <> 'completed'
              AND t.due_date IS NOT NULL
              AND t.due_date <= NOW() + INTERVAL '3 days'
            ORDER BY t.due_date ASC
            LIMIT 20
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Most recently updated tasks assigned to or created by a user
    pub async fn recent_for_user(
        pool: &PgPool,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<TaskWithNames>, sqlx::Error> {
        sqlx::query_as::<_, TaskWithNames>(&format!(
            r#"{SELECT_WITH_NAMES}
            WHERE t.assigned_to = $1 OR t.created_by = $1
            ORDER BY t.updated_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Tasks assigned to a user and created since `since`, for the digest
    pub async fn digest_items(
        pool: &PgPool,
        user_id: i32,
        since: DateTime<Utc>,
    ) -> Result<Vec<DigestItem>, sqlx::Error> {
        sqlx::query_as::<_, DigestItem>(
            r#"
            SELECT id, title, status, priority
            FROM tasks
            WHERE assigned_to = $1 AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update and bumps `updated_at`
    pub async fn update(
        pool: &PgPool,
        id: i32,
        changes: &UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                assigned_to = CASE WHEN $6 THEN $7 ELSE assigned_to END,
                due_date = CASE WHEN $8 THEN $9 ELSE due_date END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, status, priority, team_id,
                      assigned_to, created_by, due_date, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.status)
        .bind(changes.priority)
        .bind(changes.assigned_to.is_some())
        .bind(changes.assigned_to.flatten())
        .bind(changes.due_date.is_some())
        .bind(changes.due_date.flatten())
        .fetch_optional(pool)
        .await
    }

    /// Deletes a task; comments, attachments, labels and time entries cascade
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
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
    fn test_status_round_trips_through_str() {
        for status in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed] {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        let parsed: TaskPriority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, TaskPriority::High);
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_update_task_is_empty() {
        assert!(UpdateTask::default().is_empty());

        let clear_assignee = UpdateTask {
            assigned_to: Some(None),
            ..Default::default()
        };
        assert!(!clear_assignee.is_empty());
    }

    #[test]
    fn test_task_with_names_flattens() {
        let now = Utc::now();
        let task = TaskWithNames {
            task: Task {
                id: 1,
                title: "Ship it".to_string(),
                description: None,
                status: TaskStatus::Pending,
                priority: TaskPriority::High,
                team_id: 2,
                assigned_to: Some(3),
                created_by: 3,
                due_date: None,
                created_at: now,
                updated_at: now,
            },
            team_name: Some("Platform".to_string()),
            assignee_name: Some("Ada".to_string()),
            assignee_email: Some("ada@example.com".to_string()),
            creator_name: Some("Ada".to_string()),
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["title"], "Ship it");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["team_name"], "Platform");
        assert!(json.get("task").is_none());
    }
}
