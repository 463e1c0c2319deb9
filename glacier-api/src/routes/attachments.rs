/// Task attachments
///
/// Files are pushed to the configured [`AttachmentStore`](crate::storage::AttachmentStore);
/// only the URL and the store's public id are kept in the database.
///
/// # Endpoints
///
/// - `GET /api/attachments/task/:taskId`
/// - `POST /api/attachments/task/:taskId` - multipart, field `file`, optional `comment_id`
/// - `DELETE /api/attachments/:attachmentId` - Uploader or team creator

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    storage::{ResourceKind, Upload},
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use bytes::Bytes;
use glacier_shared::{
    auth::{
        authorization::{require_task_access, TeamAccess},
        middleware::AuthUser,
    },
    models::{
        attachment::{Attachment, CreateAttachment},
        task::Task,
    },
};
use serde_json::{json, Value};

/// MIME types accepted for upload
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/zip",
    "application/x-zip-compressed",
    "text/plain",
];

pub fn is_allowed_mime(mime: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime)
}

/// Parts of the upload form we care about
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Upload>,
    comment_id: Option<i32>,
}

async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data: Bytes = field.bytes().await?;

                form.file = Some(Upload {
                    file_name,
                    content_type,
                    data,
                });
            }
            Some("comment_id") => {
                let text = field.text().await?;
                let text = text.trim();
                if !text.is_empty() {
                    let id = text
                        .parse()
                        .map_err(|_| ApiError::invalid_field("comment_id", "comment_id must be an integer"))?;
                    form.comment_id = Some(id);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    require_task_access(&state.db, task_id, user.id).await?;

    let attachments = Attachment::list_for_task(&state.db, task_id).await?;
    Ok(Json(json!({ "attachments": attachments })))
}

/// Upload a file to a task
///
/// # Errors
///
/// - `400 Bad Request`: no `file` part, or a type outside the allowlist
/// - `413 Payload Too Large`: body over 10 MB
/// - `503 Service Unavailable`: no attachment store configured
pub async fn upload_attachment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i32>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_form(multipart).await?;

    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("File is required"))?;

    if !is_allowed_mime(&file.content_type) {
        return Err(ApiError::bad_request("Unsupported file type"));
    }

    require_task_access(&state.db, task_id, user.id).await?;

    let file_name = file.file_name.clone();
    let file_type = file.content_type.clone();
    let file_size = file.data.len() as i64;

    let stored = state.store()?.upload(file).await?;

    let attachment = Attachment::create(
        &state.db,
        CreateAttachment {
            task_id,
            comment_id: form.comment_id,
            uploaded_by: user.id,
            file_name,
            file_type,
            file_size,
            file_url: stored.url,
            public_id: stored.public_id,
        },
    )
    .await?;

    tracing::info!(
        attachment_id = attachment.id,
        task_id,
        size = file_size,
        "Attachment uploaded"
    );

    Ok((StatusCode::CREATED, Json(json!({ "attachment": attachment }))))
}

/// Delete an attachment
///
/// The remote copy is removed on a best-effort basis; the row goes either way.
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(attachment_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let attachment = Attachment::find_by_id(&state.db, attachment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attachment not found"))?;

    let task = Task::find_by_id(&state.db, attachment.task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    let is_team_creator = TeamAccess::load(&state.db, task.team_id, user.id)
        .await?
        .is_some_and(|access| access.is_creator);

    if attachment.uploaded_by != user.id && !is_team_creator {
        return Err(ApiError::forbidden("Access denied"));
    }

    if let Some(store) = &state.store {
        let kind = ResourceKind::for_mime(&attachment.file_type);
        if let Err(e) = store.destroy(&attachment.public_id, kind).await {
            tracing::warn!(
                attachment_id,
                public_id = %attachment.public_id,
                error = %e,
                "Remote attachment delete failed"
            );
        }
    }

    Attachment::delete(&state.db, attachment_id).await?;

    Ok(Json(json!({ "message": "Attachment deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_allowlist() {
        assert!(is_allowed_mime("image/png"));
        assert!(is_allowed_mime("application/pdf"));
        assert!(is_allowed_mime("text/plain"));
        assert!(!is_allowed_mime("text/html"));
        assert!(!is_allowed_mime("application/x-msdownload"));
    }
}
