/// User profile endpoints
///
/// # Endpoints
///
/// - `GET /api/users/search?q=` - Name or email lookup for member pickers
/// - `GET|PUT /api/users/profile`
/// - `PUT /api/users/password`
/// - `GET /api/users/stats`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use glacier_shared::{
    auth::{middleware::AuthUser, password},
    models::{task::Task, team::Team, user::User},
};
use serde::Deserialize;
use serde_json::{json, Value};

const USER_SEARCH_LIMIT: i64 = 10;
const RECENT_TASKS: i64 = 10;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Users matching `q`; shorter than two characters matches nobody
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> ApiResult<Json<Value>> {
    let q = query.q.trim();
    if q.chars().count() < 2 {
        return Ok(Json(json!({ "users": [] })));
    }

    let users = User::search(&state.db, q, USER_SEARCH_LIMIT).await?;
    Ok(Json(json!({ "users": users })))
}

/// The caller's account, teams and most recently touched tasks
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let account = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let teams = Team::list_for_user(&state.db, user.id).await?;
    let recent_tasks = Task::recent_for_user(&state.db, user.id, RECENT_TASKS).await?;

    Ok(Json(json!({
        "user": account,
        "teams": teams,
        "recentTasks": recent_tasks,
    })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| n.chars().count() >= 2)
        .ok_or_else(|| ApiError::bad_request("Name must be at least 2 characters long"))?;

    let account = User::update_name(&state.db, user.id, name)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({ "message": "Profile updated successfully", "user": account })))
}

/// Change the password after re-checking the current one
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(current), Some(new)) = (
        req.current_password.as_deref().filter(|p| !p.is_empty()),
        req.new_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "Current password and new password are required",
        ));
    };

    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(
            "New password must be at least 6 characters long",
        ));
    }

    let account = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !password::verify_password(current, &account.password)? {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    let hash = password::hash_password(new)?;
    User::update_password(&state.db, user.id, &hash).await?;

    tracing::info!(user_id = user.id, "Password changed");
    Ok(Json(json!({ "message": "Password changed successfully" })))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let stats = User::stats(&state.db, user.id).await?;
    Ok(Json(json!({ "stats": stats })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_password_request_uses_camel_case() {
        let req: ChangePasswordRequest =
            serde_json::from_str(r#"{"currentPassword": "old", "newPassword": "newer1"}"#).unwrap();
        assert_eq!(req.current_password.as_deref(), Some("old"));
        assert_eq!(req.new_password.as_deref(), Some("newer1"));
    }
}
