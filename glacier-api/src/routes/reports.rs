/// Team reports
///
/// # Endpoint
///
/// ```text
/// GET /api/reports/summary?teamId=3&from=2024-05-01&to=2024-05-31
/// ```
///
/// `from` and `to` are calendar days bounding `created_at`, both inclusive.
/// The response is the bare summary: `byStatus`, `byPriority`,
/// `completedByDay`, `createdByDay` and `assigneeCounts`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use glacier_shared::{
    auth::{authorization::require_member, middleware::AuthUser},
    models::report::{DateRange, TeamSummary},
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(rename = "teamId")]
    pub team_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn parse_day(field: &str, raw: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::invalid_field(field, format!("{} must be a YYYY-MM-DD date", field))),
    }
}

impl SummaryQuery {
    fn team_id(&self) -> ApiResult<i32> {
        self.team_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request("teamId is required"))?
            .parse()
            .map_err(|_| ApiError::invalid_field("teamId", "teamId must be an integer"))
    }

    fn range(&self) -> ApiResult<DateRange> {
        let from = parse_day("from", self.from.as_deref())?;
        let to = parse_day("to", self.to.as_deref())?;
        Ok(DateRange::from_days(from, to))
    }
}

pub async fn summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<TeamSummary>> {
    let team_id = query.team_id()?;
    let range = query.range()?;

    require_member(&state.db, team_id, user.id).await?;

    let summary = TeamSummary::compute(&state.db, team_id, range).await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_id_required() {
        let query = SummaryQuery::default();
        assert!(matches!(
            query.team_id(),
            Err(ApiError::BadRequest(msg)) if msg == "teamId is required"
        ));

        let query = SummaryQuery {
            team_id: Some("12".to_string()),
            ..Default::default()
        };
        assert_eq!(query.team_id().unwrap(), 12);
    }

    #[test]
    fn test_range_bounds_whole_days() {
        let query = SummaryQuery {
            team_id: Some("1".to_string()),
            from: Some("2024-05-01".to_string()),
            to: Some("2024-05-31".to_string()),
        };

        let range = query.range().unwrap();
        assert_eq!(range.from.unwrap().to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert_eq!(range.to.unwrap().to_rfc3339(), "2024-05-31T23:59:59+00:00");

        let bad = SummaryQuery {
            from: Some("May 1".to_string()),
            ..Default::default()
        };
        assert!(bad.range().is_err());
    }
}
