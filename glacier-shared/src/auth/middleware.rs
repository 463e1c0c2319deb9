/// Session-cookie authentication middleware for Axum
///
/// The middleware reads the `glacier.sid` cookie, hashes the token, looks up
/// an unexpired session and adds the session's user to the request
/// extensions as an [`AuthUser`]. Requests without a valid session stop here
/// with 401.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware, Extension};
/// use glacier_shared::auth::middleware::{create_session_middleware, AuthUser};
/// use sqlx::PgPool;
///
/// async fn me(Extension(user): Extension<AuthUser>) -> String {
///     format!("Hello, {}!", user.name)
/// }
///
/// async fn setup(pool: PgPool) -> Router {
///     Router::new()
///         .route("/me", get(me))
///         .layer(middleware::from_fn(create_session_middleware(pool)))
/// }
/// ```

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;

use super::session::{hash_session_token, token_from_headers};
use crate::models::session::Session;
use crate::models::user::UserSummary;

/// The authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<UserSummary> for AuthUser {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session cookie, or one that matches no live session
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized", "message": "Authentication required" })),
            )
                .into_response(),
            AuthError::DatabaseError(e) => {
                tracing::error!(error = %e, "Session lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal_error", "message": "Something went wrong!" })),
                )
                    .into_response()
            }
        }
    }
}

/// Resolves the session cookie in `headers` to a user, if any
pub async fn current_user(pool: &PgPool, headers: &HeaderMap) -> Result<Option<AuthUser>, sqlx::Error> {
    let Some(token) = token_from_headers(headers) else {
        return Ok(None);
    };

    let user = Session::find_user(pool, &hash_session_token(&token)).await?;
    Ok(user.map(AuthUser::from))
}

/// Like [`current_user`], but a missing session is an error
pub async fn authenticate(pool: &PgPool, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
    current_user(pool, headers)
        .await?
        .ok_or(AuthError::Unauthenticated)
}

/// Session authentication middleware
///
/// # Errors
///
/// Returns 401 when the cookie is missing, unknown or expired, and 500 when
/// the session lookup itself fails.
pub async fn session_auth_middleware(
    pool: PgPool,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&pool, req.headers()).await?;

    tracing::Span::current().record("user_id", user.id);
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Creates a session authentication middleware closure
///
/// Helper function that captures the database pool and returns a middleware
/// function usable with `axum::middleware::from_fn`.
pub fn create_session_middleware(
    pool: PgPool,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    move |req, next| {
        let pool = pool.clone();
        Box::pin(session_auth_middleware(pool, req, next))
    }
}
