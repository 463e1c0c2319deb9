/// Team invitations
///
/// At most one pending invitation exists per (team, email): the partial
/// unique index `team_invitations_one_pending` enforces it, and
/// [`Invitation::create_or_reuse`] leans on that index instead of a
/// read-then-insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::team_member::{TeamMember, TeamRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Revoked,
}

/// Invitation row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: i32,
    pub team_id: i32,
    pub email: String,
    pub token: String,
    pub status: InvitationStatus,
    pub invited_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing view; the token stays out of it
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InvitationSummary {
    pub id: i32,
    pub email: String,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, team_id, email, token, status, invited_by, created_at, updated_at";

impl Invitation {
    /// Returns the pending invitation for `email`, creating it with `token`
    /// when there is none
    pub async fn create_or_reuse(
        pool: &PgPool,
        team_id: i32,
        email: &str,
        token: &str,
        invited_by: i32,
    ) -> Result<Self, sqlx::Error> {
        let inserted = sqlx::query_as::<_, Invitation>(&format!(
            r#"
            INSERT INTO team_invitations (team_id, email, token, invited_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (team_id, email) WHERE status = 'pending' DO NOTHING
            RETURNING {COLUMNS}
            "#
        ))
        .bind(team_id)
        .bind(email)
        .bind(token)
        .bind(invited_by)
        .fetch_optional(pool)
        .await?;

        if let Some(invitation) = inserted {
            return Ok(invitation);
        }

        sqlx::query_as::<_, Invitation>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM team_invitations
            WHERE team_id = $1 AND email = $2 AND status = 'pending'
            "#
        ))
        .bind(team_id)
        .bind(email)
        .fetch_one(pool)
        .await
    }

    /// Pending invitations of a team, newest first
    pub async fn list_pending(
        pool: &PgPool,
        team_id: i32,
    ) -> Result<Vec<InvitationSummary>, sqlx::Error> {
        sqlx::query_as::<_, InvitationSummary>(
            r#"
            SELECT id, email, status, created_at
            FROM team_invitations
            WHERE team_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await
    }

    /// Revokes a pending invitation; false when none matched
    pub async fn revoke(pool: &PgPool, team_id: i32, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE team_invitations
            SET status = 'revoked', updated_at = NOW()
            WHERE id = $1 AND team_id = $2 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(team_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Accepts the pending invitation carrying `token` on behalf of `user_id`
    ///
    /// Locks the invitation row, adds the user as a member unless they already
    /// are one, and marks it accepted in one transaction. Returns the team ID,
    /// or `None` when no pending invitation has this token.
    pub async fn accept(pool: &PgPool, token: &str, user_id: i32) -> Result<Option<i32>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM team_invitations
            WHERE token = $1 AND status = 'pending'
            FOR UPDATE
            "#
        ))
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(invitation) = invitation else {
            return Ok(None);
        };

        TeamMember::add(&mut *tx, invitation.team_id, user_id, TeamRole::Member).await?;

        sqlx::query(
            "UPDATE team_invitations SET status = 'accepted', updated_at = NOW() WHERE id = $1",
        )
        .bind(invitation.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            invitation_id = invitation.id,
            team_id = invitation.team_id,
            user_id,
            "invitation accepted"
        );

        Ok(Some(invitation.team_id))
    }
}
