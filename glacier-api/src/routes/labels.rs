/// Team labels and task labelling
///
/// # Endpoints
///
/// - `GET|POST /api/labels/team/:teamId`
/// - `PUT|DELETE /api/labels/:labelId`
/// - `GET /api/labels/tasks/:taskId`
/// - `POST /api/labels/tasks/:taskId/assign` - `{ "labelIds": [1, 2] }`
/// - `DELETE /api/labels/tasks/:taskId/labels/:labelId`

use crate::{
    app::AppState,
    error::{is_unique_violation, ApiError, ApiResult, AppJson},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use glacier_shared::{
    auth::{
        authorization::{require_member, require_task_access, TeamAccess},
        middleware::AuthUser,
    },
    models::label::{Label, DEFAULT_LABEL_COLOR},
};
use serde::Deserialize;
use serde_json::{json, Value};

const DUPLICATE_NAME: &str = "Label name must be unique per team";

/// Column widths of `labels.name` and `labels.color`
const MAX_NAME_CHARS: usize = 50;
const MAX_COLOR_CHARS: usize = 7;

#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignLabelsRequest {
    #[serde(rename = "labelIds", default)]
    pub label_ids: Value,
}

fn duplicate_name(err: sqlx::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::Conflict(DUPLICATE_NAME.to_string())
    } else {
        ApiError::from(err)
    }
}

fn check_lengths(name: Option<&str>, color: Option<&str>) -> ApiResult<()> {
    if name.is_some_and(|n| n.chars().count() > MAX_NAME_CHARS) {
        return Err(ApiError::invalid_field(
            "name",
            format!("Name must be at most {} characters", MAX_NAME_CHARS),
        ));
    }
    if color.is_some_and(|c| c.chars().count() > MAX_COLOR_CHARS) {
        return Err(ApiError::invalid_field(
            "color",
            format!("Color must be at most {} characters", MAX_COLOR_CHARS),
        ));
    }
    Ok(())
}

/// Integer ids from a `labelIds` value; `None` when it is not an array
pub fn label_ids(value: &Value) -> Option<Vec<i32>> {
    let ids = value
        .as_array()?
        .iter()
        .filter_map(|v| v.as_i64())
        .filter_map(|id| i32::try_from(id).ok())
        .collect();
    Some(ids)
}

/// Loads a label the caller may manage: any member or the creator of its team
async fn manageable_label(state: &AppState, label_id: i32, user_id: i32) -> ApiResult<Label> {
    let label = Label::find_by_id(&state.db, label_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Label not found"))?;

    let allowed = TeamAccess::load(&state.db, label.team_id, user_id)
        .await?
        .is_some_and(|access| access.is_member());

    if !allowed {
        return Err(ApiError::forbidden("Access denied"));
    }

    Ok(label)
}

pub async fn list_team_labels(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_member(&state.db, team_id, user.id).await?;

    let labels = Label::list_for_team(&state.db, team_id).await?;
    Ok(Json(json!({ "labels": labels })))
}

/// Create a label; color defaults to slate
pub async fn create_label(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(team_id): Path<i32>,
    AppJson(req): AppJson<LabelRequest>,
) -> ApiResult<impl IntoResponse> {
    require_member(&state.db, team_id, user.id).await?;

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let color = req.color.as_deref().unwrap_or(DEFAULT_LABEL_COLOR);
    check_lengths(Some(name), Some(color))?;

    let label = Label::create(&state.db, team_id, name, color, user.id)
        .await
        .map_err(duplicate_name)?;

    Ok((StatusCode::CREATED, Json(json!({ "label": label }))))
}

pub async fn update_label(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(label_id): Path<i32>,
    AppJson(req): AppJson<LabelRequest>,
) -> ApiResult<Json<Value>> {
    manageable_label(&state, label_id, user.id).await?;

    let name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    check_lengths(name, req.color.as_deref())?;

    let label = Label::update(&state.db, label_id, name, req.color.as_deref())
        .await
        .map_err(duplicate_name)?
        .ok_or_else(|| ApiError::not_found("Label not found"))?;

    Ok(Json(json!({ "label": label })))
}

pub async fn delete_label(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(label_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    manageable_label(&state, label_id, user.id).await?;
    Label::delete(&state.db, label_id).await?;

    Ok(Json(json!({ "message": "Label deleted" })))
}

pub async fn task_labels(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_task_access(&state.db, task_id, user.id).await?;

    let labels = Label::list_for_task(&state.db, task_id).await?;
    Ok(Json(json!({ "labels": labels })))
}

/// Attach labels to a task
///
/// Ids of labels from other teams are dropped silently.
pub async fn assign_labels(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
    AppJson(req): AppJson<AssignLabelsRequest>,
) -> ApiResult<Json<Value>> {
    let ids = label_ids(&req.label_ids)
        .ok_or_else(|| ApiError::bad_request("labelIds must be an array"))?;

    let (task, _) = require_task_access(&state.db, task_id, user.id).await?;

    let valid = Label::assign_to_task(&state.db, task_id, task.team_id, &ids).await?;
    if valid == 0 {
        return Ok(Json(json!({ "message": "No valid labels to assign" })));
    }

    let labels = Label::list_for_task(&state.db, task_id).await?;
    Ok(Json(json!({ "message": "Labels assigned", "labels": labels })))
}

pub async fn remove_label(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((task_id, label_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    require_task_access(&state.db, task_id, user.id).await?;
    Label::remove_from_task(&state.db, task_id, label_id).await?;

    Ok(Json(json!({ "message": "Label removed from task" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_ids() {
        assert_eq!(label_ids(&json!([1, 2, "x", 3.5, 4])), Some(vec![1, 2, 4]));
        assert_eq!(label_ids(&json!([])), Some(vec![]));
        assert_eq!(label_ids(&json!("1,2")), None);
        assert_eq!(label_ids(&Value::Null), None);
    }

    #[test]
    fn test_check_lengths() {
        assert!(check_lengths(Some("bug"), Some("#64748b")).is_ok());
        assert!(check_lengths(None, None).is_ok());
        assert!(check_lengths(Some(&"é".repeat(50)), None).is_ok());

        let err = check_lengths(Some(&"x".repeat(51)), None).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(&err, ApiError::ValidationError(d) if d[0].field == "name"));

        let err = check_lengths(Some("bug"), Some("#1234567")).unwrap_err();
        assert!(matches!(&err, ApiError::ValidationError(d) if d[0].field == "color"));
    }
}
