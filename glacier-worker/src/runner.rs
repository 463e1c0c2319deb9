/// Worker loop
///
/// Runs two periodic jobs until the shutdown token fires:
///
/// ```text
/// Worker
///   ├─> digest: sleep until the next DIGEST_HOUR:00 local, send due digests
///   └─> purge:  every SESSION_PURGE_INTERVAL_SECS, delete expired sessions
/// ```
///
/// A failed pass is logged and the loop carries on with the next one.
///
/// # Example
///
/// ```no_run
/// use glacier_worker::{config::WorkerConfig, runner::Worker};
/// use glacier_shared::db::pool::create_pool;
/// use glacier_shared::email::build_mailer;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = WorkerConfig::from_env()?;
/// let pool = create_pool(config.database.clone()).await?;
/// let mailer = build_mailer(&config.mail)?;
///
/// let worker = Worker::new(pool, mailer, &config);
/// let shutdown = worker.shutdown_token();
/// tokio::spawn(async move {
///     tokio::signal::ctrl_c().await.ok();
///     shutdown.cancel();
/// });
///
/// worker.run().await;
/// # Ok(())
/// # }
/// ```

use chrono::{Local, Utc};
use glacier_shared::email::{EmailTemplates, Mailer};
use glacier_shared::models::session::Session;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::digest::DigestSender;
use crate::schedule::{next_run_at, periods_for};

/// Retry delay when no next run time can be computed
const SCHEDULE_RETRY: Duration = Duration::from_secs(60);

pub struct Worker {
    db: PgPool,
    digests: DigestSender,
    digest_hour: u32,
    purge_interval: Duration,
    shutdown_token: CancellationToken,
}

impl Worker {
    pub fn new(db: PgPool, mailer: Arc<dyn Mailer>, config: &WorkerConfig) -> Self {
        let templates = EmailTemplates::new(config.app_name.clone(), config.client_url.clone());

        Self {
            digests: DigestSender::new(db.clone(), mailer, templates),
            db,
            digest_hour: config.digest_hour,
            purge_interval: config.session_purge_interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops both loops
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs until shutdown; an in-flight pass finishes first
    pub async fn run(&self) {
        tracing::info!(
            digest_hour = self.digest_hour,
            purge_interval_secs = self.purge_interval.as_secs(),
            "Worker starting"
        );

        tokio::join!(self.digest_loop(), self.purge_loop());

        tracing::info!("Worker shut down");
    }

    async fn digest_loop(&self) {
        loop {
            let wait = match next_run_at(&Local::now(), self.digest_hour) {
                Some(next) => {
                    tracing::debug!(next = %next, "Next digest run scheduled");
                    (next.with_timezone(&Utc) - Utc::now())
                        .to_std()
                        .unwrap_or(Duration::ZERO)
                }
                None => {
                    tracing::warn!("Could not compute next digest time; retrying");
                    SCHEDULE_RETRY
                }
            };

            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = sleep(wait) => {}
            }

            let fired_at = Local::now();
            match self
                .digests
                .run(periods_for(&fired_at), fired_at.with_timezone(&Utc))
                .await
            {
                Ok(report) => tracing::info!(
                    sent = report.sent,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Digest run complete"
                ),
                Err(e) => tracing::error!(error = %e, "Digest run failed"),
            }
        }
    }

    async fn purge_loop(&self) {
        let mut ticker = interval(self.purge_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match purge_sessions(&self.db).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired sessions purged"),
                Err(e) => tracing::error!(error = %e, "Session purge failed"),
            }
        }
    }
}

/// Deletes sessions past their expiry
pub async fn purge_sessions(db: &PgPool) -> Result<u64, sqlx::Error> {
    Session::purge_expired(db).await
}
