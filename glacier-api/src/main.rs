//! # Glacier API Server
//!
//! Serves the JSON API under `/api` and the team chat socket at `/ws`.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/glacier SESSION_SECRET=... cargo run -p glacier-api
//! ```
//!
//! Set `LOG_FORMAT=json` for structured logs and `RUST_LOG` to adjust levels.

use glacier_api::{
    app::{build_router, AppState},
    config::Config,
    storage::{AttachmentStore, CloudinaryStore},
};
use glacier_shared::{
    db::{migrations::run_migrations, pool::create_pool},
    email::build_mailer,
    redis::RedisClient,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "glacier_api=debug,glacier_shared=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Glacier API Server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(config.database.clone()).await?;
    run_migrations(&pool).await?;

    // Rate limiting falls back to in-process counters without Redis
    let redis = match config.redis.clone() {
        Some(redis_config) => match RedisClient::new(redis_config).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable; using in-memory rate limiting");
                None
            }
        },
        None => None,
    };

    let mailer = build_mailer(&config.mail)?;

    let store: Option<Arc<dyn AttachmentStore>> = match config.cloudinary.clone() {
        Some(cloudinary) => Some(Arc::new(CloudinaryStore::new(cloudinary)?)),
        None => {
            tracing::warn!("Cloudinary is not configured; attachment uploads are disabled");
            None
        }
    };

    let addr = config.bind_address();
    let state = AppState::new(pool.clone(), config, mailer, store, redis);
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}
