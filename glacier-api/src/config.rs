/// Configuration management for the API server
///
/// Everything comes from environment variables; a `.env` file is loaded
/// first when present.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required), `DATABASE_MAX_CONNECTIONS`
/// - `API_HOST` / `API_PORT` (default `0.0.0.0:5000`)
/// - `CLIENT_URL` (default `http://localhost:5173`), `APP_NAME` (default `Glacier`)
/// - `SESSION_SECRET` (required, at least 32 characters), `COOKIE_SECURE`
/// - `REDIS_URL` (optional), `RATE_LIMIT_MAX` (100), `RATE_LIMIT_WINDOW_SECS` (900)
/// - `SMTP_*`, `MAIL_FROM*`: see [`MailConfig::from_env`]
/// - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`
///
/// # Example
///
/// ```no_run
/// use glacier_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use glacier_shared::db::pool::DatabaseConfig;
use glacier_shared::email::MailConfig;
use glacier_shared::redis::RedisConfig;
use std::env;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
    pub mail: MailConfig,

    /// `None` when Redis is not configured
    pub redis: Option<RedisConfig>,

    /// `None` when the attachment store is not configured
    pub cloudinary: Option<CloudinaryConfig>,
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Browser origin allowed by CORS and used in email links
    pub client_url: String,

    /// Product name used in email subjects
    pub app_name: String,
}

/// Session cookie settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Signs password-reset tokens
    ///
    /// IMPORTANT: must be kept secret and be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Adds `Secure` to the session cookie; also enables HSTS
    pub cookie_secure: bool,
}

/// Fixed-window request budget per client IP
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

/// Cloudinary credentials
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn flag(name: &str) -> bool {
    env::var(name).map(|v| v == "true" || v == "1").unwrap_or(false)
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a number does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = var_or("API_PORT", "5000").parse::<u16>()?;
        let app_name = var_or("APP_NAME", glacier_shared::DEFAULT_APP_NAME);

        let secret = env::var("SESSION_SECRET")
            .map_err(|_| anyhow::anyhow!("SESSION_SECRET environment variable is required"))?;

        if secret.len() < 32 {
            anyhow::bail!("SESSION_SECRET must be at least 32 characters long");
        }

        let rate_limit = RateLimitConfig {
            max_requests: var_or("RATE_LIMIT_MAX", "100").parse()?,
            window_secs: var_or("RATE_LIMIT_WINDOW_SECS", "900").parse()?,
        };

        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret))
                if !cloud_name.is_empty() && !api_key.is_empty() && !api_secret.is_empty() =>
            {
                Some(CloudinaryConfig {
                    cloud_name,
                    api_key,
                    api_secret,
                })
            }
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port,
                client_url: var_or("CLIENT_URL", "http://localhost:5173"),
                app_name: app_name.clone(),
            },
            database: DatabaseConfig::from_env()?,
            session: SessionConfig {
                secret,
                cookie_secure: flag("COOKIE_SECURE"),
            },
            rate_limit,
            mail: MailConfig::from_env(&app_name),
            redis: RedisConfig::from_env(),
            cloudinary,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_defaults() {
        let limits = RateLimitConfig::default();
        assert_eq!(limits.max_requests, 100);
        assert_eq!(limits.window_secs, 900);
    }

    #[test]
    fn test_var_or_default() {
        assert_eq!(var_or("GLACIER_TEST_SURELY_UNSET", "x"), "x");
        assert!(!flag("GLACIER_TEST_SURELY_UNSET"));
    }
}
