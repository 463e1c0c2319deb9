/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use glacier_api::{app::AppState, config::Config};
/// use glacier_shared::email::build_mailer;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let mailer = build_mailer(&config.mail)?;
/// let state = AppState::new(pool, config, mailer, None, None);
/// let app = glacier_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{
        rate_limit::{rate_limit_layer, RateLimiter},
        security::SecurityHeadersLayer,
    },
    realtime::{socket::ws_handler, ChatHub},
    routes,
    storage::{AttachmentStore, StorageError},
};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use glacier_shared::auth::middleware::create_session_middleware;
use glacier_shared::email::{send_in_background, EmailBody, EmailTemplates, Mailer, OutgoingEmail};
use glacier_shared::redis::RedisClient;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Request bodies, uploads included, are capped at 10 MB
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is a handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Team chat rooms
    pub hub: Arc<ChatHub>,

    pub mailer: Arc<dyn Mailer>,
    pub templates: Arc<EmailTemplates>,

    /// `None` when no attachment store is configured
    pub store: Option<Arc<dyn AttachmentStore>>,

    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        mailer: Arc<dyn Mailer>,
        store: Option<Arc<dyn AttachmentStore>>,
        redis: Option<RedisClient>,
    ) -> Self {
        let templates = EmailTemplates::new(config.api.app_name.clone(), config.api.client_url.clone());
        let limiter = RateLimiter::new(config.rate_limit, redis);

        Self {
            db,
            config: Arc::new(config),
            hub: Arc::new(ChatHub::default()),
            mailer,
            templates: Arc::new(templates),
            store,
            limiter: Arc::new(limiter),
        }
    }

    /// Secret that signs password-reset tokens
    pub fn session_secret(&self) -> &str {
        &self.config.session.secret
    }

    pub fn cookie_secure(&self) -> bool {
        self.config.session.cookie_secure
    }

    /// Absolute link into the web client
    pub fn client_link(&self, path: &str) -> String {
        format!("{}{}", self.config.api.client_url.trim_end_matches('/'), path)
    }

    pub fn app_name(&self) -> &str {
        &self.config.api.app_name
    }

    pub fn store(&self) -> Result<&Arc<dyn AttachmentStore>, StorageError> {
        self.store.as_ref().ok_or(StorageError::NotConfigured)
    }

    /// Queues an email without waiting for delivery
    pub fn send_email(&self, to: &str, subject: String, body: EmailBody) {
        send_in_background(
            self.mailer.clone(),
            OutgoingEmail {
                to: to.to_string(),
                subject,
                body,
            },
        );
    }
}

async fn route_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Route not found" })))
}

/// Rewrites a bare 413 from the body limit layer into the JSON error envelope
async fn payload_too_large_envelope(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return ApiError::PayloadTooLarge("Request body too large".to_string()).into_response();
    }

    response
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /api/health            # public
/// ├── /api/auth/...          # public, except /me
/// ├── /api/{teams,tasks,comments,attachments,labels,subtasks,
/// │        time-entries,notifications,email,search,reports,
/// │        users,chat}/...   # session required
/// └── /ws                    # WebSocket, session checked at upgrade
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Security headers
/// 2. CORS (`CLIENT_URL`, credentials allowed)
/// 3. Request tracing
/// 4. Body limit (10 MB)
/// 5. Rate limiting (`/api` only)
/// 6. Session authentication (protected routers only)
pub fn build_router(state: AppState) -> Router {
    let session = || axum::middleware::from_fn(create_session_middleware(state.db.clone()));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/status", get(routes::auth::status))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password", post(routes::auth::reset_password))
        .merge(
            Router::new()
                .route("/me", get(routes::auth::me))
                .layer(session()),
        );

    let team_routes = Router::new()
        .route("/", get(routes::teams::list_teams).post(routes::teams::create_team))
        .route("/invitations/accept", post(routes::teams::accept_invitation))
        .route(
            "/:team_id",
            get(routes::teams::get_team)
                .put(routes::teams::update_team)
                .delete(routes::teams::delete_team),
        )
        .route("/:team_id/members", post(routes::teams::add_member))
        .route("/:team_id/members/:user_id", delete(routes::teams::remove_member))
        .route("/:team_id/members/:user_id/role", post(routes::teams::update_member_role))
        .route(
            "/:team_id/invitations",
            get(routes::teams::list_invitations).post(routes::teams::create_invitation),
        )
        .route(
            "/:team_id/invitations/:invitation_id/revoke",
            post(routes::teams::revoke_invitation),
        );

    let task_routes = Router::new()
        .route("/reminders", get(routes::tasks::reminders))
        .route("/my-tasks", get(routes::tasks::my_tasks))
        .route(
            "/team/:team_id",
            get(routes::tasks::list_team_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:task_id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        );

    let comment_routes = Router::new()
        .route(
            "/task/:task_id",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route("/task/:task_id/activity", get(routes::comments::task_activity))
        .route(
            "/:comment_id",
            put(routes::comments::update_comment).delete(routes::comments::delete_comment),
        );

    let attachment_routes = Router::new()
        .route(
            "/task/:task_id",
            get(routes::attachments::list_attachments).post(routes::attachments::upload_attachment),
        )
        .route("/:attachment_id", delete(routes::attachments::delete_attachment));

    let label_routes = Router::new()
        .route(
            "/team/:team_id",
            get(routes::labels::list_team_labels).post(routes::labels::create_label),
        )
        .route(
            "/:label_id",
            put(routes::labels::update_label).delete(routes::labels::delete_label),
        )
        .route("/tasks/:task_id", get(routes::labels::task_labels))
        .route("/tasks/:task_id/assign", post(routes::labels::assign_labels))
        .route("/tasks/:task_id/labels/:label_id", delete(routes::labels::remove_label));

    let subtask_routes = Router::new()
        .route(
            "/task/:task_id",
            get(routes::subtasks::list_subtasks).post(routes::subtasks::create_subtask),
        )
        .route(
            "/:subtask_id",
            put(routes::subtasks::update_subtask).delete(routes::subtasks::delete_subtask),
        )
        .route("/:subtask_id/toggle", patch(routes::subtasks::toggle_subtask));

    let time_entry_routes = Router::new()
        .route("/", post(routes::time_entries::create_manual_entry))
        .route("/task/:task_id", get(routes::time_entries::list_entries))
        .route("/start", post(routes::time_entries::start_timer))
        .route("/stop", post(routes::time_entries::stop_timer));

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/read-all", put(routes::notifications::mark_all_read))
        .route("/clear-read", delete(routes::notifications::clear_read))
        .route("/:notification_id/read", put(routes::notifications::mark_read))
        .route("/:notification_id", delete(routes::notifications::delete_notification));

    let email_routes = Router::new()
        .route(
            "/preferences",
            get(routes::email::get_preferences).put(routes::email::update_preferences),
        )
        .route("/test", post(routes::email::send_test_email));

    let user_routes = Router::new()
        .route("/search", get(routes::users::search_users))
        .route("/profile", get(routes::users::profile).put(routes::users::update_profile))
        .route("/password", put(routes::users::change_password))
        .route("/stats", get(routes::users::stats));

    let chat_routes = Router::new()
        .route(
            "/teams/:team_id/messages",
            get(routes::chat::list_messages).post(routes::chat::post_message),
        )
        .route(
            "/messages/:message_id",
            put(routes::chat::edit_message).delete(routes::chat::delete_message),
        )
        .route("/unread-count", get(routes::chat::unread_count));

    let protected = Router::new()
        .nest("/teams", team_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .nest("/attachments", attachment_routes)
        .nest("/labels", label_routes)
        .nest("/subtasks", subtask_routes)
        .nest("/time-entries", time_entry_routes)
        .nest("/notifications", notification_routes)
        .nest("/email", email_routes)
        .route("/search", get(routes::search::search))
        .route("/reports/summary", get(routes::reports::summary))
        .nest("/users", user_routes)
        .nest("/chat", chat_routes)
        .layer(session());

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/auth", auth_routes)
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_layer,
        ));

    let cors = match state.config.api.client_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(client_url = %state.config.api.client_url, "CLIENT_URL is not a valid origin; CORS disabled");
            CorsLayer::new()
        }
    };

    let enable_hsts = state.cookie_secure();

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(map_response(payload_too_large_envelope))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(enable_hsts))
        .with_state(state)
}
