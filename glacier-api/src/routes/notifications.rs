/// In-app notification endpoints, always scoped to the caller

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use glacier_shared::{auth::middleware::AuthUser, models::notification::Notification};
use serde::Deserialize;
use serde_json::{json, Value};

const MAX_PAGE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl PageQuery {
    fn bounds(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE), self.offset.max(0))
    }
}

/// A page of notifications, newest first, with the unread total
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let (limit, offset) = page.bounds();

    let notifications = Notification::list_for_user(&state.db, user.id, limit, offset).await?;
    let unread = Notification::unread_count(&state.db, user.id).await?;

    Ok(Json(json!({ "notifications": notifications, "unreadCount": unread })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(notification_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    if !Notification::mark_read(&state.db, notification_id, user.id).await? {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(Json(json!({ "message": "Notification marked as read" })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let updated = Notification::mark_all_read(&state.db, user.id).await?;
    tracing::debug!(user_id = user.id, updated, "Notifications marked read");

    Ok(Json(json!({ "message": "All notifications marked as read" })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(notification_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    if !Notification::delete(&state.db, notification_id, user.id).await? {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(Json(json!({ "message": "Notification deleted" })))
}

pub async fn clear_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    Notification::clear_read(&state.db, user.id).await?;
    Ok(Json(json!({ "message": "Read notifications cleared" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_bounds() {
        let page: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(page.bounds(), (20, 0));

        let page = PageQuery { limit: 5000, offset: -3 };
        assert_eq!(page.bounds(), (MAX_PAGE, 0));
    }
}
