/// Cross-resource search
///
/// Every query is scoped to the caller's accessible teams (created or
/// joined). An empty query applies no text filter, so the structured
/// filters alone select results.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;

use super::comment::CommentWithAuthor;
use super::task::{TaskPriority, TaskStatus, TaskWithNames};
use super::team::Team;
use super::user::UserSummary;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 25;

/// Which resource to search; absent means all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Tasks,
    Teams,
    Users,
    Comments,
}

impl FromStr for SearchKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tasks" => Ok(SearchKind::Tasks),
            "teams" => Ok(SearchKind::Teams),
            "users" => Ok(SearchKind::Users),
            "comments" => Ok(SearchKind::Comments),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: String,
    pub kind: Option<SearchKind>,
    pub team_id: Option<i32>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee: Option<i32>,
    pub limit: i64,
}

impl SearchParams {
    /// Clamps a requested limit to `1..=MAX_LIMIT`, defaulting when absent
    pub fn clamp_limit(requested: Option<i64>) -> i64 {
        match requested {
            Some(n) if n > 0 => n.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        }
    }

    fn wants(&self, kind: SearchKind) -> bool {
        self.kind.map_or(true, |k| k == kind)
    }

    fn pattern(&self) -> Option<String> {
        if self.query.is_empty() {
            None
        } else {
            Some(format!("%{}%", self.query))
        }
    }
}

/// A comment hit with the title of its task
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentHit {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: CommentWithAuthor,
    pub task_title: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskWithNames>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<Team>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentHit>>,
}

/// Runs the requested searches for `user_id`
pub async fn search(
    pool: &PgPool,
    user_id: i32,
    params: &SearchParams,
) -> Result<SearchResults, sqlx::Error> {
    let team_ids = Team::accessible_ids(pool, user_id).await?;

    // A team filter outside the caller's teams is ignored, not an error.
    let team_filter = params.team_id.filter(|id| team_ids.contains(id));
    let pattern = params.pattern();
    let mut results = SearchResults::default();

    if params.wants(SearchKind::Tasks) {
        let tasks = sqlx::query_as::<_, TaskWithNames>(
            r#"
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
            WHERE t.team_id = ANY($1)
              AND ($2::integer IS NULL OR t.team_id = $2)
              AND ($3::task_status IS NULL OR t.status = $3)
              AND ($4::task_priority IS NULL OR t.priority = $4)
              AND ($5::integer IS NULL OR t.assigned_to = $5)
              AND ($6::text IS NULL OR t.title ILIKE $6 OR t.description ILIKE $6)
            ORDER BY t.created_at DESC
            LIMIT $7
            "#,
        )
        .bind(&team_ids)
        .bind(team_filter)
        .bind(params.status)
        .bind(params.priority)
        .bind(params.assignee)
        .bind(&pattern)
        .bind(params.limit)
        .fetch_all(pool)
        .await?;
        results.tasks = Some(tasks);
    }

    if params.wants(SearchKind::Teams) {
        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, description, created_by, created_at, updated_at
            FROM teams
            WHERE id = ANY($1)
              AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(&team_ids)
        .bind(&pattern)
        .bind(params.limit)
        .fetch_all(pool)
        .await?;
        results.teams = Some(teams);
    }

    if params.wants(SearchKind::Users) {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.email
            FROM users u
            WHERE (u.id = $1
                   OR u.id IN (SELECT user_id FROM team_members WHERE team_id = ANY($2))
                   OR u.id IN (SELECT created_by FROM teams WHERE id = ANY($2)))
              AND ($3::text IS NULL OR u.name ILIKE $3 OR u.email ILIKE $3)
            ORDER BY u.created_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(&team_ids)
        .bind(&pattern)
        .bind(params.limit)
        .fetch_all(pool)
        .await?;
        results.users = Some(users);
    }

    if params.wants(SearchKind::Comments) {
        let comments = sqlx::query_as::<_, CommentHit>(
            r#"
            SELECT c.id, c.task_id, c.user_id, c.comment, c.is_edited, c.created_at, c.updated_at,
                   u.name AS user_name, u.email AS user_email,
                   t.title AS task_title
            FROM task_comments c
            JOIN users u ON u.id = c.user_id
            JOIN tasks t ON t.id = c.task_id
            WHERE t.team_id = ANY($1)
              AND ($2::integer IS NULL OR t.team_id = $2)
              AND ($3::text IS NULL OR c.comment ILIKE $3)
            ORDER BY c.created_at DESC
            LIMIT $4
            "#,
        )
        .bind(&team_ids)
        .bind(team_filter)
        .bind(&pattern)
        .bind(params.limit)
        .fetch_all(pool)
        .await?;
        results.comments = Some(comments);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(SearchParams::clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(SearchParams::clamp_limit(Some(0)), DEFAULT_LIMIT);
        assert_eq!(SearchParams::clamp_limit(Some(-3)), DEFAULT_LIMIT);
        assert_eq!(SearchParams::clamp_limit(Some(5)), 5);
        assert_eq!(SearchParams::clamp_limit(Some(100)), MAX_LIMIT);
    }

    #[test]
    fn test_wants_all_kinds_when_unset() {
        let params = SearchParams::default();
        assert!(params.wants(SearchKind::Tasks));
        assert!(params.wants(SearchKind::Comments));

        let only_users = SearchParams {
            kind: Some(SearchKind::Users),
            ..Default::default()
        };
        assert!(only_users.wants(SearchKind::Users));
        assert!(!only_users.wants(SearchKind::Teams));
    }

    #[test]
    fn test_empty_query_has_no_pattern() {
        assert!(SearchParams::default().pattern().is_none());

        let params = SearchParams {
            query: "deploy".to_string(),
            ..Default::default()
        };
        assert_eq!(params.pattern().as_deref(), Some("%deploy%"));
    }

    #[test]
    fn test_results_skip_unrequested_kinds() {
        let results = SearchResults {
            users: Some(vec![]),
            ..Default::default()
        };
        let json = serde_json::to_value(&results).unwrap();
        assert!(json.get("users").is_some());
        assert!(json.get("tasks").is_none());
    }
}
