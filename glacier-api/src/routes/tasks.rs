/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/tasks/reminders` - Open tasks due within three days, overdue included
/// - `GET /api/tasks/my-tasks` - Tasks assigned to the caller
/// - `GET|POST /api/tasks/team/:teamId`
/// - `GET|PUT|DELETE /api/tasks/:taskId`
///
/// Creating and updating a task write rows to the activity timeline and
/// notify a newly assigned user.

use super::parsed;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
    notify,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use glacier_shared::{
    auth::{
        authorization::{require_member, require_task_access},
        middleware::AuthUser,
    },
    models::{
        activity::{Activity, NewActivity},
        task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask},
        team_member::TeamMember,
    },
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    #[validate(range(min = 1, message = "assigned_to must be a positive integer"))]
    pub assigned_to: Option<i32>,

    pub due_date: Option<String>,
}

/// Listing filters as sent by the client
///
/// Blank or unknown values are dropped so a stale filter in the UI shows
/// everything instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
}

impl From<&TaskListQuery> for TaskFilter {
    fn from(q: &TaskListQuery) -> Self {
        TaskFilter {
            status: parsed(q.status.as_deref()),
            priority: parsed(q.priority.as_deref()),
            assigned_to: parsed(q.assigned_to.as_deref()),
        }
    }
}

/// Partial task update
///
/// `assigned_to` and `due_date` distinguish an absent key (leave as is) from
/// an explicit `null` (clear).
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "nullable")]
    pub assigned_to: Option<Option<i32>>,

    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| ApiError::invalid_field("due_date", "due_date must be an ISO-8601 date"))
}

async fn ensure_assignable(state: &AppState, team_id: i32, assignee: Option<i32>) -> ApiResult<()> {
    if let Some(assignee) = assignee {
        if !TeamMember::is_member_or_creator(&state.db, team_id, assignee).await? {
            return Err(ApiError::bad_request("Assigned user must be a team member"));
        }
    }
    Ok(())
}

fn id_text(id: Option<i32>) -> Option<String> {
    id.map(|id| id.to_string())
}

fn date_text(date: Option<DateTime<Utc>>) -> Option<String> {
    date.map(|d| d.to_rfc3339())
}

/// Activity rows describing the difference between two versions of a task
pub fn activity_for_changes(before: &Task, after: &Task, user_id: i32) -> Vec<NewActivity> {
    let mut entries = Vec::new();
    let change = |kind, field, old, new| NewActivity::field_change(after.id, user_id, kind, field, old, new);

    if before.status != after.status {
        entries.push(change(
            "status_changed",
            "status",
            Some(before.status.as_str().to_string()),
            Some(after.status.as_str().to_string()),
        ));
    }

    if before.assigned_to != after.assigned_to {
        entries.push(change(
            "assigned",
            "assigned_to",
            id_text(before.assigned_to),
            id_text(after.assigned_to),
        ));
    }

    if before.title != after.title {
        entries.push(change("updated", "title", Some(before.title.clone()), Some(after.title.clone())));
    }

    if before.description != after.description {
        entries.push(change(
            "updated",
            "description",
            before.description.clone(),
            after.description.clone(),
        ));
    }

    if before.priority != after.priority {
        entries.push(change(
            "updated",
            "priority",
            Some(before.priority.as_str().to_string()),
            Some(after.priority.as_str().to_string()),
        ));
    }

    if before.due_date != after.due_date {
        entries.push(change(
            "updated",
            "due_date",
            date_text(before.due_date),
            date_text(after.due_date),
        ));
    }

    entries
}

pub async fn reminders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let reminders = Task::reminders(&state.db, user.id).await?;
    Ok(Json(json!({ "reminders": reminders })))
}

pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Value>> {
    let tasks = Task::list_assigned(&state.db, user.id, &TaskFilter::from(&query)).await?;
    Ok(Json(json!({ "tasks": tasks })))
}

/// Tasks of a team, filtered by `status`, `priority` and `assigned_to`
pub async fn list_team_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Value>> {
    require_member(&state.db, team_id, user.id).await?;

    let tasks = Task::list_for_team(&state.db, team_id, &TaskFilter::from(&query)).await?;
    Ok(Json(json!({ "tasks": tasks })))
}

/// Create a task in a team
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, or the assignee is not on the team
/// - `403 Forbidden`: caller is not a member
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    require_member(&state.db, team_id, user.id).await?;
    req.validate()?;

    let due_date = req.due_date.as_deref().map(parse_due_date).transpose()?;
    ensure_assignable(&state, team_id, req.assigned_to).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description,
            priority: req.priority.unwrap_or_default(),
            team_id,
            assigned_to: req.assigned_to,
            created_by: user.id,
            due_date,
        },
    )
    .await?;

    Activity::log(
        &state.db,
        NewActivity::action(task.id, user.id, "created", format!("{} created the task", user.name)),
    )
    .await?;

    tracing::info!(task_id = task.id, team_id, user_id = user.id, "Task created");

    notify::task_assigned(&state, &task, &user).await;

    let task = Task::find_with_names(&state.db, task.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Task created successfully", "task": task })),
    ))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_task_access(&state.db, task_id, user.id).await?;

    let task = Task::find_with_names(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(Json(json!({ "task": task })))
}

/// Partially update a task
///
/// Each changed field is written to the activity timeline. A new assignee
/// other than the caller is notified.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> ApiResult<Json<Value>> {
    let (before, _) = require_task_access(&state.db, task_id, user.id).await?;
    req.validate()?;

    if matches!(req.assigned_to, Some(Some(id)) if id < 1) {
        return Err(ApiError::invalid_field("assigned_to", "assigned_to must be a positive integer"));
    }

    let due_date = match req.due_date {
        Some(Some(raw)) => Some(Some(parse_due_date(&raw)?)),
        Some(None) => Some(None),
        None => None,
    };

    if let Some(assignee) = req.assigned_to {
        ensure_assignable(&state, before.team_id, assignee).await?;
    }

    let changes = UpdateTask {
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        assigned_to: req.assigned_to,
        due_date,
    };

    let after = Task::update(&state.db, task_id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    for entry in activity_for_changes(&before, &after, user.id) {
        Activity::log(&state.db, entry).await?;
    }

    if after.assigned_to != before.assigned_to {
        notify::task_assigned(&state, &after, &user).await;
    }

    Ok(Json(json!({ "message": "Task updated successfully", "task": after })))
}

/// Delete a task: its creator, the team creator or a team admin
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let (task, access) = require_task_access(&state.db, task_id, user.id).await?;

    if task.created_by != user.id && !access.is_admin() {
        return Err(ApiError::forbidden("Access denied"));
    }

    Task::delete(&state.db, task_id).await?;
    tracing::info!(task_id, user_id = user.id, "Task deleted");

    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        let now = Utc::now();
        Task {
            id: 7,
            title: "Write docs".to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            team_id: 1,
            assigned_to: None,
            created_by: 1,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_parse_due_date() {
        let ts = parse_due_date("2024-05-01T12:30:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T12:30:00+00:00");

        let day = parse_due_date("2024-05-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-05-01T00:00:00+00:00");

        assert!(parse_due_date("next week").is_err());
    }

    #[test]
    fn test_list_query_drops_blank_and_unknown_filters() {
        let uri = "/tasks?status=&priority=urgent&assigned_to=abc".parse().unwrap();
        let Query(query) = Query::<TaskListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(TaskFilter::from(&query), TaskFilter::default());

        let uri = "/tasks?status=in_progress&priority=high&assigned_to=4".parse().unwrap();
        let Query(query) = Query::<TaskListQuery>::try_from_uri(&uri).unwrap();
        let filter = TaskFilter::from(&query);
        assert_eq!(filter.status, Some(TaskStatus::InProgress));
        assert_eq!(filter.priority, Some(TaskPriority::High));
        assert_eq!(filter.assigned_to, Some(4));
    }

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"assigned_to": null}"#).unwrap();
        assert_eq!(req.assigned_to, Some(None));
        assert_eq!(req.due_date, None);

        let req: UpdateTaskRequest = serde_json::from_str(r#"{"assigned_to": 4}"#).unwrap();
        assert_eq!(req.assigned_to, Some(Some(4)));
    }

    #[test]
    fn test_activity_for_changes() {
        let before = task();
        let mut after = before.clone();
        after.status = TaskStatus::Completed;
        after.assigned_to = Some(3);

        let entries = activity_for_changes(&before, &after, 2);
        let kinds: Vec<_> = entries.iter().map(|e| (e.action_type, e.field_changed)).collect();
        assert_eq!(
            kinds,
            vec![("status_changed", Some("status")), ("assigned", Some("assigned_to"))]
        );
        assert_eq!(entries[0].new_value.as_deref(), Some("completed"));
        assert_eq!(entries[1].old_value, None);

        assert!(activity_for_changes(&before, &before, 2).is_empty());
    }

    #[test]
    fn test_create_request_rejects_non_positive_assignee() {
        let req: CreateTaskRequest =
            serde_json::from_str(r#"{"title": "Ship it", "assigned_to": 0}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
