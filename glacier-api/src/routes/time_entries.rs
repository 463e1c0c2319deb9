/// Time tracking endpoints
///
/// # Endpoints
///
/// - `GET /api/time-entries/task/:taskId` - Entries plus the caller's running timer
/// - `POST /api/time-entries/start` - `{ "task_id": 1 }`
/// - `POST /api/time-entries/stop` - `{ "task_id": 1 }`
/// - `POST /api/time-entries` - Manual entry
///
/// Start and stop are single statements guarded by a partial unique index,
/// so concurrent requests cannot open two timers or close one twice.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use glacier_shared::{
    auth::{authorization::require_task_access, middleware::AuthUser},
    models::time_entry::TimeEntry,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct TimerRequest {
    pub task_id: Option<i32>,
}

impl TimerRequest {
    fn task_id(&self) -> ApiResult<i32> {
        self.task_id
            .ok_or_else(|| ApiError::bad_request("task_id is required"))
    }
}

#[derive(Debug, Deserialize)]
pub struct ManualEntryRequest {
    pub task_id: Option<i32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
}

/// Parses a manual entry's interval; the end must come after the start
pub fn parse_range(start: &str, end: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = DateTime::parse_from_rfc3339(start.trim()).ok()?.with_timezone(&Utc);
    let end = DateTime::parse_from_rfc3339(end.trim()).ok()?.with_timezone(&Utc);

    (end > start).then_some((start, end))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_task_access(&state.db, task_id, user.id).await?;

    let entries = TimeEntry::list_for_task(&state.db, task_id).await?;
    let active = TimeEntry::find_running(&state.db, task_id, user.id).await?;

    Ok(Json(json!({ "entries": entries, "active": active })))
}

pub async fn start_timer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<TimerRequest>,
) -> ApiResult<impl IntoResponse> {
    let task_id = req.task_id()?;
    require_task_access(&state.db, task_id, user.id).await?;

    let entry = TimeEntry::start(&state.db, task_id, user.id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Timer is already running"))?;

    tracing::debug!(task_id, user_id = user.id, entry_id = entry.id, "Timer started");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Timer started", "entry": entry })),
    ))
}

pub async fn stop_timer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<TimerRequest>,
) -> ApiResult<Json<Value>> {
    let task_id = req.task_id()?;
    require_task_access(&state.db, task_id, user.id).await?;

    let entry = TimeEntry::stop(&state.db, task_id, user.id)
        .await?
        .ok_or_else(|| ApiError::bad_request("No running timer"))?;

    Ok(Json(json!({ "message": "Timer stopped", "entry": entry })))
}

/// Record a finished interval after the fact
pub async fn create_manual_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<ManualEntryRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(task_id), Some(start), Some(end)) = (req.task_id, req.start_time.as_deref(), req.end_time.as_deref())
    else {
        return Err(ApiError::bad_request("task_id, start_time, end_time are required"));
    };

    require_task_access(&state.db, task_id, user.id).await?;

    let (start, end) =
        parse_range(start, end).ok_or_else(|| ApiError::bad_request("Invalid time range"))?;

    let description = req.description.as_deref().filter(|d| !d.is_empty());
    let entry = TimeEntry::create_manual(&state.db, task_id, user.id, start, end, description).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Time entry added", "entry": entry })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let (start, end) = parse_range("2024-05-01T09:00:00Z", "2024-05-01T10:30:00+00:00").unwrap();
        assert_eq!((end - start).num_minutes(), 90);

        assert!(parse_range("2024-05-01T10:00:00Z", "2024-05-01T09:00:00Z").is_none());
        assert!(parse_range("2024-05-01T10:00:00Z", "2024-05-01T10:00:00Z").is_none());
        assert!(parse_range("yesterday", "2024-05-01T10:00:00Z").is_none());
    }

    #[test]
    fn test_timer_request_requires_task() {
        let req: TimerRequest = serde_json::from_str("{}").unwrap();
        assert!(req.task_id().is_err());
    }
}
