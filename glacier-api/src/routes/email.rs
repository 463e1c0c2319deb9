/// Email preference endpoints
///
/// # Endpoints
///
/// - `GET /api/email/preferences` - Saved preferences or the defaults
/// - `PUT /api/email/preferences` - Partial update, upserted
/// - `POST /api/email/test` - Send the welcome template to the caller

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson, ErrorResponse},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use glacier_shared::{
    auth::middleware::AuthUser,
    email::OutgoingEmail,
    models::email_preference::{DigestFrequency, EmailPreferences, UpdateEmailPreferences},
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
pub struct PreferencesRequest {
    pub instant_task_assigned: Option<bool>,
    pub instant_comment: Option<bool>,
    pub instant_team_invite: Option<bool>,
    pub deadline_reminders: Option<bool>,
    pub digest_frequency: Option<String>,
}

impl TryFrom<PreferencesRequest> for UpdateEmailPreferences {
    type Error = ApiError;

    fn try_from(req: PreferencesRequest) -> Result<Self, Self::Error> {
        let digest_frequency = req
            .digest_frequency
            .as_deref()
            .map(|raw| raw.parse::<DigestFrequency>())
            .transpose()
            .map_err(|_| ApiError::bad_request("Invalid digest frequency"))?;

        Ok(UpdateEmailPreferences {
            instant_task_assigned: req.instant_task_assigned,
            instant_comment: req.instant_comment,
            instant_team_invite: req.instant_team_invite,
            deadline_reminders: req.deadline_reminders,
            digest_frequency,
        })
    }
}

pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let preferences = EmailPreferences::for_user(&state.db, user.id).await?;
    Ok(Json(json!({ "preferences": preferences })))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<PreferencesRequest>,
) -> ApiResult<Json<Value>> {
    let changes = UpdateEmailPreferences::try_from(req)?;
    let preferences = EmailPreferences::upsert(&state.db, user.id, &changes).await?;

    Ok(Json(json!({ "message": "Preferences updated", "preferences": preferences })))
}

/// Send a test email and wait for the transport's answer
pub async fn send_test_email(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Response> {
    let email = OutgoingEmail {
        to: user.email.clone(),
        subject: format!("Test Email from {}", state.app_name()),
        body: state
            .templates
            .welcome(&user.name, Some(&state.config.api.client_url)),
    };

    match state.mailer.send(email).await {
        Ok(()) => Ok(Json(json!({ "message": "Test email sent" })).into_response()),
        Err(e) => {
            tracing::error!(user_id = user.id, error = %e, "Test email failed");
            let body = ErrorResponse {
                error: "email_failed".to_string(),
                message: "Failed to send test email".to_string(),
                errors: None,
            };
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_frequency_is_validated() {
        let req = PreferencesRequest {
            digest_frequency: Some("hourly".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            UpdateEmailPreferences::try_from(req),
            Err(ApiError::BadRequest(msg)) if msg == "Invalid digest frequency"
        ));

        let req = PreferencesRequest {
            digest_frequency: Some("daily".to_string()),
            instant_comment: Some(false),
            ..Default::default()
        };
        let changes = UpdateEmailPreferences::try_from(req).unwrap();
        assert_eq!(changes.digest_frequency, Some(DigestFrequency::Daily));
        assert_eq!(changes.instant_comment, Some(false));
        assert_eq!(changes.instant_task_assigned, None);
    }
}
