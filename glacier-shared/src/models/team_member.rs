/// Team membership rows and roles
///
/// # Schema
///
/// ```sql
/// CREATE TYPE team_role AS ENUM ('member', 'admin');
///
/// CREATE TABLE team_members (
///     id SERIAL PRIMARY KEY,
///     team_id INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role team_role NOT NULL DEFAULT 'member',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT team_members_team_user_unique UNIQUE (team_id, user_id)
/// );
/// ```
///
/// The team creator is not a role: it is `teams.created_by`. See
/// [`crate::auth::authorization::TeamAccess`] for how the two combine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use std::fmt;
use std::str::FromStr;

/// Role of a member row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Member,
    Admin,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Member => "member",
            TeamRole::Admin => "admin",
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(TeamRole::Member),
            "admin" => Ok(TeamRole::Admin),
            _ => Err(()),
        }
    }
}

/// Raw membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub id: i32,
    pub team_id: i32,
    pub user_id: i32,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

/// A member as listed on the team page
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamMemberDetail {
    /// User ID
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

impl TeamMember {
    /// Adds a user to a team
    ///
    /// Returns `None` when the user already had a row; the existing role is
    /// left untouched.
    pub async fn add<'e, E>(
        executor: E,
        team_id: i32,
        user_id: i32,
        role: TeamRole,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (team_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT team_members_team_user_unique DO NOTHING
            RETURNING id, team_id, user_id, role, joined_at
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await
    }

    /// Finds the membership row of a user in a team
    pub async fn find(
        pool: &PgPool,
        team_id: i32,
        user_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT id, team_id, user_id, role, joined_at
            FROM team_members
            WHERE team_id = $1 AND user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Members of a team with their user fields, in join order
    pub async fn list(pool: &PgPool, team_id: i32) -> Result<Vec<TeamMemberDetail>, sqlx::Error> {
        sqlx::query_as::<_, TeamMemberDetail>(
            r#"
            SELECT u.id, u.name, u.email, tm.role, tm.joined_at
            FROM team_members tm
            JOIN users u ON u.id = tm.user_id
            WHERE tm.team_id = $1
            ORDER BY tm.joined_at
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await
    }

    /// Changes a member's role; false when there is no such member
    pub async fn update_role(
        pool: &PgPool,
        team_id: i32,
        user_id: i32,
        role: TeamRole,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE team_members SET role = $3 WHERE team_id = $1 AND user_id = $2",
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a member; false when there was nothing to remove
    pub async fn remove(pool: &PgPool, team_id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// True when the user created the team or holds a member row
    pub async fn is_member_or_creator(
        pool: &PgPool,
        team_id: i32,
        user_id: i32,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM teams WHERE id = $1 AND created_by = $2)
                OR EXISTS(SELECT 1 FROM team_members WHERE team_id = $1 AND user_id = $2)
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
