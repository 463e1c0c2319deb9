/// Login sessions
///
/// A session row ties the SHA-256 of a cookie token to a user. The plaintext
/// token only ever lives in the browser cookie.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use super::user::UserSummary;

/// Session row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: i32,
    pub user_id: i32,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Stores a new session valid for `ttl`
    pub async fn create(
        pool: &PgPool,
        user_id: i32,
        token_hash: &str,
        ttl: Duration,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(Utc::now() + ttl)
        .fetch_one(pool)
        .await
    }

    /// Resolves an unexpired session to its user
    pub async fn find_user(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.email
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await
    }

    /// Deletes one session (logout)
    pub async fn delete(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes every session a user holds
    pub async fn delete_for_user(pool: &PgPool, user_id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Removes expired rows, returning how many were deleted
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
