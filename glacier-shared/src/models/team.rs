/// Team model and database operations
///
/// A team is owned by the user in `created_by`. Creating a team also inserts
/// the creator as an `admin` row in `team_members`, so most membership queries
/// can rely on the member table alone; the ones that must not (chat, search)
/// check `created_by` as well.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id SERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use glacier_shared::models::team::{Team, CreateTeam};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let team = Team::create_with_creator(
///     &pool,
///     CreateTeam {
///         name: "Platform".to_string(),
///         description: None,
///         created_by: 1,
///     },
/// )
/// .await?;
///
/// let teams = Team::list_for_user(&pool, 1).await?;
/// assert!(teams.iter().any(|t| t.id == team.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

use super::team_member::{TeamMember, TeamMemberDetail, TeamRole};
use super::user::UserSummary;

/// Team row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,

    /// User that created (and owns) the team
    pub created_by: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A team as seen from the caller's team list
///
/// `role` is `creator` for owned teams, otherwise the caller's member role.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamWithRole {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub role: String,
    pub joined_at: Option<DateTime<Utc>>,
}

/// Team with its creator and member list
#[derive(Debug, Clone, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub creator: Option<UserSummary>,
    pub members: Vec<TeamMemberDetail>,
}

/// Input for creating a team
#[derive(Debug, Clone)]
pub struct CreateTeam {
    pub name: String,
    pub description: Option<String>,
    pub created_by: i32,
}

impl Team {
    /// Inserts a bare team row
    ///
    /// Generic over the executor so it can run inside a transaction.
    pub async fn create<'e, E>(executor: E, data: &CreateTeam) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.created_by)
        .fetch_one(executor)
        .await
    }

    /// Creates a team and enrolls its creator as an admin, atomically
    pub async fn create_with_creator(pool: &PgPool, data: CreateTeam) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let team = Team::create(&mut *tx, &data).await?;
        TeamMember::add(&mut *tx, team.id, data.created_by, TeamRole::Admin).await?;

        tx.commit().await?;

        tracing::debug!(team_id = team.id, created_by = data.created_by, "team created");

        Ok(team)
    }

    /// Finds a team by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, description, created_by, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Teams the user created, newest first, followed by teams they joined
    pub async fn list_for_user(pool: &PgPool, user_id: i32) -> Result<Vec<TeamWithRole>, sqlx::Error> {
        let mut teams = sqlx::query_as::<_, TeamWithRole>(
            r#"
            SELECT t.id, t.name, t.description, t.created_by, t.created_at, t.updated_at,
                   'creator'::text AS role, NULL::timestamptz AS joined_at
            FROM teams t
            WHERE t.created_by = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let joined = sqlx::query_as::<_, TeamWithRole>(
            r#"
            SELECT t.id, t.name, t.description, t.created_by, t.created_at, t.updated_at,
                   tm.role::text AS role, tm.joined_at
            FROM teams t
            JOIN team_members tm ON tm.team_id = t.id
            WHERE tm.user_id = $1 AND t.created_by <> $1
            ORDER BY tm.joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        teams.extend(joined);
        Ok(teams)
    }

    /// Loads a team with its creator and members
    pub async fn detail(pool: &PgPool, id: i32) -> Result<Option<TeamDetail>, sqlx::Error> {
        let Some(team) = Team::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let creator = sqlx::query_as::<_, UserSummary>(
            "SELECT id, name, email FROM users WHERE id = $1",
        )
        .bind(team.created_by)
        .fetch_optional(pool)
        .await?;

        let members = TeamMember::list(pool, id).await?;

        Ok(Some(TeamDetail {
            team,
            creator,
            members,
        }))
    }

    /// Partial update; absent fields keep their value
    pub async fn update(
        pool: &PgPool,
        id: i32,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a team; tasks, members, labels and messages cascade
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// IDs of every team the user created or belongs to
    pub async fn accessible_ids(pool: &PgPool, user_id: i32) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT id FROM teams WHERE created_by = $1
            UNION
            SELECT team_id FROM team_members WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_detail_flattens_team_fields() {
        let now = Utc::now();
        let detail = TeamDetail {
            team: Team {
                id: 3,
                name: "Platform".to_string(),
                description: Some("infra".to_string()),
                created_by: 1,
                created_at: now,
                updated_at: now,
            },
            creator: Some(UserSummary {
                id: 1,
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            }),
            members: vec![],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["name"], "Platform");
        assert_eq!(json["creator"]["email"], "ada@example.com");
        assert!(json["members"].as_array().unwrap().is_empty());
    }
}
