/// Task comments and the activity timeline
///
/// # Endpoints
///
/// - `GET|POST /api/comments/task/:taskId`
/// - `GET /api/comments/task/:taskId/activity`
/// - `PUT|DELETE /api/comments/:commentId` - Author only

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
    notify,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use glacier_shared::{
    auth::{authorization::require_task_access, middleware::AuthUser},
    models::{
        activity::{Activity, NewActivity},
        comment::{Comment, CommentWithAuthor},
    },
};
use serde::Deserialize;
use serde_json::{json, Value};

const NOT_FOUND_OR_DENIED: &str = "Comment not found or access denied";

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub comment: Option<String>,
}

impl CommentRequest {
    /// The trimmed comment text, rejecting empty bodies
    fn body(&self) -> ApiResult<&str> {
        match self.comment.as_deref().map(str::trim) {
            Some(body) if !body.is_empty() => Ok(body),
            _ => Err(ApiError::bad_request("Comment is required")),
        }
    }
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_task_access(&state.db, task_id, user.id).await?;

    let comments = Comment::list_for_task(&state.db, task_id).await?;
    Ok(Json(json!({ "comments": comments })))
}

/// Add a comment
///
/// Logs a `commented` activity row and notifies the assignee and the task
/// creator, skipping the commenter.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
    AppJson(req): AppJson<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let body = req.body()?;
    let (task, _) = require_task_access(&state.db, task_id, user.id).await?;

    let comment = Comment::create(&state.db, task_id, user.id, body).await?;

    Activity::log(
        &state.db,
        NewActivity::action(
            task_id,
            user.id,
            "commented",
            format!("{} commented on the task", user.name),
        ),
    )
    .await?;

    notify::comment_added(&state, &task, comment.id, body, &user).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment added successfully",
            "comment": CommentWithAuthor {
                comment,
                user_name: user.name,
                user_email: user.email,
            },
        })),
    ))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<i32>,
    AppJson(req): AppJson<CommentRequest>,
) -> ApiResult<Json<Value>> {
    let body = req.body()?;

    let comment = Comment::update_owned(&state.db, comment_id, user.id, body)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND_OR_DENIED))?;

    Ok(Json(json!({ "message": "Comment updated successfully", "comment": comment })))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    if !Comment::delete_owned(&state.db, comment_id, user.id).await? {
        return Err(ApiError::not_found(NOT_FOUND_OR_DENIED));
    }

    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}

/// Activity timeline of a task, newest first
pub async fn task_activity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_task_access(&state.db, task_id, user.id).await?;

    let activity = Activity::list_for_task(&state.db, task_id).await?;
    Ok(Json(json!({ "activity": activity })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_body_is_trimmed() {
        let req = CommentRequest {
            comment: Some("  looks good  ".to_string()),
        };
        assert_eq!(req.body().unwrap(), "looks good");
    }

    #[test]
    fn test_blank_comment_rejected() {
        for comment in [None, Some(String::new()), Some("   ".to_string())] {
            let req = CommentRequest { comment };
            assert!(matches!(req.body(), Err(ApiError::BadRequest(_))));
        }
    }
}
