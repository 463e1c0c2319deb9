/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required), `DATABASE_MAX_CONNECTIONS`
/// - `APP_NAME` (default `Glacier`), `CLIENT_URL` (default `http://localhost:5173`)
/// - `DIGEST_HOUR`: local hour the digest runs at (default 8)
/// - `SESSION_PURGE_INTERVAL_SECS`: expired-session sweep period (default 3600)
/// - `SMTP_*`, `MAIL_FROM*`: same as the API server

use glacier_shared::db::pool::DatabaseConfig;
use glacier_shared::email::MailConfig;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    pub app_name: String,
    pub client_url: String,

    /// Hour of the day, server-local, when digests go out
    pub digest_hour: u32,

    pub session_purge_interval: Duration,
}

impl WorkerConfig {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Fails when `DATABASE_URL` is missing, a number does not parse, or
    /// `DIGEST_HOUR` is not in 0..=23.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let app_name = env::var("APP_NAME")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| glacier_shared::DEFAULT_APP_NAME.to_string());

        let digest_hour = parse_var("DIGEST_HOUR", 8u32)?;
        if digest_hour > 23 {
            anyhow::bail!("DIGEST_HOUR must be between 0 and 23");
        }

        let purge_secs = parse_var("SESSION_PURGE_INTERVAL_SECS", 3600u64)?;
        if purge_secs == 0 {
            anyhow::bail!("SESSION_PURGE_INTERVAL_SECS must be positive");
        }

        Ok(Self {
            database: DatabaseConfig::from_env()?,
            mail: MailConfig::from_env(&app_name),
            client_url: env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            app_name,
            digest_hour,
            session_purge_interval: Duration::from_secs(purge_secs),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => Ok(raw.trim().parse()?),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default_when_unset() {
        assert_eq!(parse_var("GLACIER_WORKER_SURELY_UNSET", 8u32).unwrap(), 8);
    }
}
