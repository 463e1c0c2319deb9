/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id SERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use glacier_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(
///     &pool,
///     CreateUser {
///         name: "Ada".to_string(),
///         email: "ada@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///     },
/// )
/// .await?;
///
/// let found = User::find_by_email(&pool, "ada@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// User account
///
/// The password column holds an Argon2id PHC string and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// User ID
    pub id: i32,

    /// Display name
    pub name: String,

    /// Login email, unique across users
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// The public face of a user: what other team members get to see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,

    /// Argon2id hash, never the plaintext password
    pub password_hash: String,
}

/// Task counts by status for one assignee
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AssignedTaskCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

/// Numbers shown on the profile page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub assigned_tasks: AssignedTaskCounts,
    pub total_teams: i64,
    pub created_tasks: i64,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the email is already registered.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by exact email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Changes the display name
    pub async fn update_name(
        pool: &PgPool,
        id: i32,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, password, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the stored password hash
    pub async fn update_password(
        pool: &PgPool,
        id: i32,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Case-insensitive substring match on name or email
    pub async fn search(
        pool: &PgPool,
        query: &str,
        limit: i64,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let pattern = format!("%{}%", query);

        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE name ILIKE $1 OR email ILIKE $1
            ORDER BY name
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Collects the profile statistics for a user
    pub async fn stats(pool: &PgPool, id: i32) -> Result<UserStats, sqlx::Error> {
        let by_status: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status::text, COUNT(*)
            FROM tasks
            WHERE assigned_to = $1
            GROUP BY status
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let mut assigned_tasks = AssignedTaskCounts::default();
        for (status, count) in by_status {
            match status.as_str() {
                "pending" => assigned_tasks.pending = count,
                "in_progress" => assigned_tasks.in_progress = count,
                "completed" => assigned_tasks.completed = count,
                _ => {}
            }
        }

        let total_teams: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT t.id)
            FROM teams t
            LEFT JOIN team_members tm ON tm.team_id = t.id
            WHERE t.created_by = $1 OR tm.user_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        let created_tasks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE created_by = $1")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(UserStats {
            assigned_tasks,
            total_teams,
            created_tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization_hides_password() {
        let user = User {
            id: 7,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "ada@example.com");

        let summary = UserSummary::from(&user);
        assert_eq!(summary.id, 7);
        assert_eq!(summary.name, "Ada");
    }

    #[test]
    fn test_user_stats_camel_case() {
        let stats = UserStats {
            assigned_tasks: AssignedTaskCounts {
                pending: 1,
                in_progress: 2,
                completed: 3,
            },
            total_teams: 4,
            created_tasks: 5,
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["assignedTasks"]["in_progress"], 2);
        assert_eq!(json["totalTeams"], 4);
        assert_eq!(json["createdTasks"], 5);
    }
}
