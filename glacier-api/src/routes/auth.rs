/// Authentication endpoints
///
/// Session-cookie authentication: login stores a random token's SHA-256 in
/// `sessions` and hands the token to the browser as the `glacier.sid`
/// cookie.
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Create an account (no session is opened)
/// - `POST /api/auth/login` - Open a session
/// - `POST /api/auth/logout` - Close the current session
/// - `GET /api/auth/me` - Current user (session required)
/// - `GET /api/auth/status` - Whether the request carries a session
/// - `POST /api/auth/forgot-password` - Email a reset link
/// - `POST /api/auth/reset-password` - Set a new password from a reset link

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, AppJson},
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use glacier_shared::{
    auth::{
        middleware::{current_user, AuthUser},
        password,
        reset_token::{create_reset_token, validate_reset_token, ResetTokenError},
        session::{
            clear_session_cookie, generate_session_token, hash_session_token, session_cookie,
            session_ttl, token_from_headers,
        },
    },
    models::{
        session::Session,
        user::{CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// Account as returned right after registration
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// { "name": "Ada", "email": "ada@example.com", "password": "secret1" }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "message": "User registered successfully",
///   "user": { "id": 1, "name": "Ada", "email": "ada@example.com", "created_at": "..." }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, or the email is taken
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::bad_request("User with this email already exists"));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
        },
    )
    .await
    .map_err(|e| {
        // Lost a race with a concurrent registration for the same email
        if crate::error::is_unique_violation(&e) {
            ApiError::bad_request("User with this email already exists")
        } else {
            ApiError::from(e)
        }
    })?;

    tracing::info!(user_id = user.id, "User registered");

    let dashboard = state.client_link("/dashboard");
    state.send_email(
        &user.email,
        format!("Welcome to {}", state.app_name()),
        state.templates.welcome(&user.name, Some(&dashboard)),
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": RegisteredUser {
                id: user.id,
                name: user.name,
                email: user.email,
                created_at: user.created_at,
            },
        })),
    ))
}

/// Log in and receive the session cookie
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password)? {
        return Err(invalid());
    }

    let token = generate_session_token();
    Session::create(&state.db, user.id, &hash_session_token(&token), session_ttl()).await?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        [(header::SET_COOKIE, session_cookie(&token, state.cookie_secure()))],
        Json(json!({
            "message": "Login successful",
            "user": AuthUser {
                id: user.id,
                name: user.name,
                email: user.email,
            },
        })),
    ))
}

/// Close the current session; succeeds without one too
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    if let Some(token) = token_from_headers(&headers) {
        Session::delete(&state.db, &hash_session_token(&token)).await?;
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(state.cookie_secure()))],
        Json(json!({ "message": "Logout successful" })),
    ))
}

pub async fn me(Extension(user): Extension<AuthUser>) -> Json<Value> {
    Json(json!({ "user": user }))
}

pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let body = match current_user(&state.db, &headers).await? {
        Some(user) => json!({ "authenticated": true, "user": user }),
        None => json!({ "authenticated": false }),
    };

    Ok(Json(body))
}

/// Email a reset link if the account exists
///
/// The response is the same either way, so the endpoint cannot be used to
/// probe for accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;

    if let Some(user) = User::find_by_email(&state.db, &req.email).await? {
        let token = create_reset_token(user.id, &user.password, state.session_secret())?;
        let link = state.client_link(&format!("/reset-password?token={}", token));

        state.send_email(
            &user.email,
            format!("{} - Password Reset", state.app_name()),
            state.templates.password_reset(&link),
        );

        tracing::info!(user_id = user.id, "Password reset requested");
    }

    Ok(Json(json!({ "message": FORGOT_PASSWORD_MESSAGE })))
}

/// Replace the password using a reset token and revoke every session
///
/// A token stops working once the password changes, because it is bound to
/// a fingerprint of the hash it was issued against.
///
/// # Errors
///
/// - `400 Bad Request`: `Invalid or expired reset token`
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;

    let claims = validate_reset_token(&req.token, state.session_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|user| claims.matches_password(&user.password))
        .ok_or_else(|| ApiError::from(ResetTokenError::Invalid("stale token".to_string())))?;

    let password_hash = password::hash_password(&req.password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;
    let revoked = Session::delete_for_user(&state.db, user.id).await?;

    tracing::info!(user_id = user.id, revoked_sessions = revoked, "Password reset");

    Ok(Json(json!({ "message": "Password has been reset successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            name: "A".to_string(),
            email: "ada".to_string(),
            password: "123".to_string(),
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 3);
    }

    #[test]
    fn test_reset_request_requires_token() {
        let req = ResetPasswordRequest {
            token: String::new(),
            password: "secret1".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
