/// Subtask checklist endpoints
///
/// Every endpoint requires access to the parent task.

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
use glacier_shared::{
    auth::{authorization::require_task_access, middleware::AuthUser},
    models::subtask::Subtask,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct CreateSubtaskRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubtaskRequest {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

fn trimmed(title: Option<&str>) -> Option<&str> {
    title.map(str::trim).filter(|t| !t.is_empty())
}

/// Loads a subtask whose parent task the caller can access
async fn accessible_subtask(state: &AppState, subtask_id: i32, user_id: i32) -> ApiResult<Subtask> {
    let subtask = Subtask::find_by_id(&state.db, subtask_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Subtask not found"))?;

    require_task_access(&state.db, subtask.parent_task_id, user_id).await?;
    Ok(subtask)
}

pub async fn list_subtasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_task_access(&state.db, task_id, user.id).await?;

    let subtasks = Subtask::list_for_task(&state.db, task_id).await?;
    Ok(Json(json!({ "subtasks": subtasks })))
}

pub async fn create_subtask(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
    AppJson(req): AppJson<CreateSubtaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = trimmed(req.title.as_deref()).ok_or_else(|| ApiError::bad_request("Title is required"))?;
    require_task_access(&state.db, task_id, user.id).await?;

    let subtask = Subtask::create(&state.db, task_id, title, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Subtask created", "subtask": subtask })),
    ))
}

/// Rename and/or set completion; a blank title keeps the old one
pub async fn update_subtask(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(subtask_id): Path<i32>,
    AppJson(req): AppJson<UpdateSubtaskRequest>,
) -> ApiResult<Json<Value>> {
    accessible_subtask(&state, subtask_id, user.id).await?;

    let subtask = Subtask::update(
        &state.db,
        subtask_id,
        trimmed(req.title.as_deref()),
        req.is_completed,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Subtask not found"))?;

    Ok(Json(json!({ "message": "Subtask updated", "subtask": subtask })))
}

pub async fn toggle_subtask(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(subtask_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    accessible_subtask(&state, subtask_id, user.id).await?;

    let subtask = Subtask::toggle(&state.db, subtask_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Subtask not found"))?;

    Ok(Json(json!({ "message": "Subtask toggled", "subtask": subtask })))
}

pub async fn delete_subtask(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(subtask_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    accessible_subtask(&state, subtask_id, user.id).await?;
    Subtask::delete(&state.db, subtask_id).await?;

    Ok(Json(json!({ "message": "Subtask deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_title() {
        assert_eq!(trimmed(Some("  Draft  ")), Some("Draft"));
        assert_eq!(trimmed(Some("   ")), None);
        assert_eq!(trimmed(None), None);
    }
}
