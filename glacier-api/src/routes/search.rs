/// Cross-resource search
///
/// # Endpoint
///
/// ```text
/// GET /api/search?q=deploy&type=tasks&teamId=3&status=pending&priority=high&assignee=7&limit=10
/// ```
///
/// Every parameter is optional. Unknown filter values are ignored rather
/// than rejected, matching how the search box sends whatever the user typed.
///
/// # Response
///
/// ```json
/// { "query": "deploy", "results": { "tasks": [...], "teams": [...], "users": [...], "comments": [...] } }
/// ```

use super::parsed;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use glacier_shared::{
    auth::middleware::AuthUser,
    models::search::{self, SearchParams},
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "teamId")]
    pub team_id: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub limit: Option<String>,
}

impl From<&SearchQuery> for SearchParams {
    fn from(q: &SearchQuery) -> Self {
        SearchParams {
            query: q.q.as_deref().map(str::trim).unwrap_or_default().to_string(),
            kind: parsed(q.kind.as_deref()),
            team_id: parsed(q.team_id.as_deref()),
            status: parsed(q.status.as_deref()),
            priority: parsed(q.priority.as_deref()),
            assignee: parsed(q.assignee.as_deref()),
            limit: SearchParams::clamp_limit(parsed(q.limit.as_deref())),
        }
    }
}

pub async fn search(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let params = SearchParams::from(&query);
    let results = search::search(&state.db, user.id, &params).await?;

    Ok(Json(json!({ "query": params.query, "results": results })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glacier_shared::models::{
        search::{SearchKind, DEFAULT_LIMIT, MAX_LIMIT},
        task::TaskStatus,
    };

    #[test]
    fn test_query_to_params() {
        let query = SearchQuery {
            q: Some("  deploy ".to_string()),
            kind: Some("tasks".to_string()),
            team_id: Some("3".to_string()),
            status: Some("in_progress".to_string()),
            limit: Some("100".to_string()),
            ..Default::default()
        };

        let params = SearchParams::from(&query);
        assert_eq!(params.query, "deploy");
        assert_eq!(params.kind, Some(SearchKind::Tasks));
        assert_eq!(params.team_id, Some(3));
        assert_eq!(params.status, Some(TaskStatus::InProgress));
        assert_eq!(params.limit, MAX_LIMIT);
    }

    #[test]
    fn test_unknown_values_are_ignored() {
        let query = SearchQuery {
            kind: Some("projects".to_string()),
            team_id: Some("abc".to_string()),
            priority: Some("urgent".to_string()),
            ..Default::default()
        };

        let params = SearchParams::from(&query);
        assert_eq!(params.query, "");
        assert_eq!(params.kind, None);
        assert_eq!(params.team_id, None);
        assert_eq!(params.priority, None);
        assert_eq!(params.limit, DEFAULT_LIMIT);
    }
}
