/// Time tracking entries
///
/// A running timer is an entry with `end_time IS NULL`. The partial unique
/// index `time_entries_one_running` allows at most one per (task, user), which
/// makes [`TimeEntry::start`] race-free: a concurrent second start hits the
/// index and is reported as "already running". Stopping is a single
/// conditional `UPDATE … RETURNING`, so only one of two concurrent stops wins.
///
/// # Duration
///
/// Durations are whole minutes, rounded, and never below one minute.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

/// Time entry row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TimeEntry {
    pub id: i32,
    pub task_id: i32,
    pub user_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str =
    "id, task_id, user_id, start_time, end_time, duration_minutes, description, created_at";

/// Rounded minutes between two instants, at least 1
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
    let millis = (end - start).num_milliseconds() as f64;
    let minutes = (millis / 60_000.0).round();
    minutes.max(1.0) as i32
}

impl TimeEntry {
    /// All entries of a task, latest start first
    pub async fn list_for_task(pool: &PgPool, task_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            "SELECT {COLUMNS} FROM time_entries WHERE task_id = $1 ORDER BY start_time DESC"
        ))
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// The user's running timer on a task, if any
    pub async fn find_running(
        pool: &PgPool,
        task_id: i32,
        user_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM time_entries
            WHERE task_id = $1 AND user_id = $2 AND end_time IS NULL
            "#
        ))
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Starts a timer now
    ///
    /// Returns `None` when the user already has a running timer on the task.
    pub async fn start(pool: &PgPool, task_id: i32, user_id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            INSERT INTO time_entries (task_id, user_id, start_time)
            VALUES ($1, $2, NOW())
            ON CONFLICT (task_id, user_id) WHERE end_time IS NULL DO NOTHING
            RETURNING {COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Stops the running timer and records its duration
    ///
    /// Returns `None` when no timer was running.
    pub async fn stop(pool: &PgPool, task_id: i32, user_id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            UPDATE time_entries
            SET end_time = NOW(),
                duration_minutes = GREATEST(
                    1,
                    ROUND(EXTRACT(EPOCH FROM (NOW() - start_time)) / 60)
                )::integer
            WHERE task_id = $1 AND user_id = $2 AND end_time IS NULL
            RETURNING {COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Records a closed entry for a past interval
    ///
    /// The caller validates `end > start`.
    pub async fn create_manual(
        pool: &PgPool,
        task_id: i32,
        user_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            INSERT INTO time_entries (task_id, user_id, start_time, end_time, duration_minutes, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(duration_minutes(start, end))
        .bind(description)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_duration_rounds_to_nearest_minute() {
        let start = Utc::now();
        assert_eq!(duration_minutes(start, start + Duration::seconds(90)), 2);
        assert_eq!(duration_minutes(start, start + Duration::seconds(89)), 1);
        assert_eq!(duration_minutes(start, start + Duration::minutes(45)), 45);
    }

    #[test]
    fn test_duration_is_at_least_one_minute() {
        let start = Utc::now();
        assert_eq!(duration_minutes(start, start + Duration::seconds(5)), 1);
        assert_eq!(duration_minutes(start, start), 1);
    }
}
