/// Per-IP rate limiting for the REST API
///
/// Fixed-window counting: each client IP gets `max_requests` per
/// `window_secs`. With Redis configured the counters live in Redis (keys
/// `rl:{ip}`) and are shared by every API process; otherwise, or whenever a
/// Redis command fails, they are kept in process memory.
///
/// # Headers
///
/// - `X-RateLimit-Limit`: requests allowed per window
/// - `X-RateLimit-Remaining`: requests left in the current window
/// - `X-RateLimit-Reset`: seconds until the window resets
/// - `Retry-After`: seconds to wait (429 responses only)
///
/// # Example
///
/// ```no_run
/// use glacier_api::config::RateLimitConfig;
/// use glacier_api::middleware::rate_limit::{rate_limit_layer, RateLimiter};
/// use axum::{middleware, Router};
/// use std::sync::Arc;
///
/// let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default(), None));
/// let app: Router = Router::new()
///     .layer(middleware::from_fn_with_state(limiter, rate_limit_layer));
/// ```

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use glacier_shared::redis::{RedisClient, WindowHit};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Local windows are swept once the map grows past this many keys
const LOCAL_SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct LocalWindow {
    count: u64,
    resets_at: Instant,
}

/// Fixed-window counter store
pub struct RateLimiter {
    config: RateLimitConfig,
    redis: Option<RedisClient>,
    local: Mutex<HashMap<String, LocalWindow>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, redis: Option<RedisClient>) -> Self {
        Self {
            config,
            redis,
            local: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Counts one request for `client`
    pub async fn hit(&self, client: &str) -> WindowHit {
        if let Some(redis) = &self.redis {
            match redis.hit_window(&format!("rl:{}", client), self.config.window_secs).await {
                Ok(hit) => return hit,
                Err(e) => {
                    tracing::warn!(error = %e, "Rate limit backend failed; counting in memory");
                }
            }
        }

        self.hit_local(client, Instant::now())
    }

    fn hit_local(&self, client: &str, now: Instant) -> WindowHit {
        let window = Duration::from_secs(self.config.window_secs);

        // A poisoned lock only means another request panicked mid-update;
        // the counters are still usable.
        let mut local = self.local.lock().unwrap_or_else(|e| e.into_inner());

        if local.len() > LOCAL_SWEEP_THRESHOLD {
            local.retain(|_, w| w.resets_at > now);
        }

        let entry = local.entry(client.to_string()).or_insert(LocalWindow {
            count: 0,
            resets_at: now + window,
        });

        if entry.resets_at <= now {
            *entry = LocalWindow {
                count: 0,
                resets_at: now + window,
            };
        }

        entry.count += 1;

        WindowHit {
            count: entry.count,
            reset_secs: entry.resets_at.saturating_duration_since(now).as_secs().max(1),
        }
    }
}

/// Client address from `ConnectInfo`, or `unknown` when the server was not
/// started with connect info
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn set_header(response: &mut Response, name: &'static str, value: u64) {
    response
        .headers_mut()
        .insert(HeaderName::from_static(name), HeaderValue::from(value));
}

/// Rate limiting middleware
///
/// # Errors
///
/// - 429 Too Many Requests: the window budget is spent
pub async fn rate_limit_layer(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&request);
    let limits = limiter.config();
    let hit = limiter.hit(&client).await;

    if hit.count > limits.max_requests {
        tracing::warn!(client = %client, count = hit.count, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after: hit.reset_secs,
            message: RATE_LIMIT_MESSAGE.to_string(),
        });
    }

    let mut response = next.run(request).await;

    set_header(&mut response, "x-ratelimit-limit", limits.max_requests);
    set_header(&mut response, "x-ratelimit-remaining", limits.max_requests - hit.count);
    set_header(&mut response, "x-ratelimit-reset", hit.reset_secs);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::Service as _;

    fn limiter(max_requests: u64) -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(
            RateLimitConfig {
                max_requests,
                window_secs: 60,
            },
            None,
        ))
    }

    #[test]
    fn test_local_window_counts_and_resets() {
        let limiter = limiter(5);
        let start = Instant::now();

        assert_eq!(limiter.hit_local("1.2.3.4", start).count, 1);
        assert_eq!(limiter.hit_local("1.2.3.4", start).count, 2);
        assert_eq!(limiter.hit_local("5.6.7.8", start).count, 1);

        let later = start + Duration::from_secs(61);
        let hit = limiter.hit_local("1.2.3.4", later);
        assert_eq!(hit.count, 1);
        assert_eq!(hit.reset_secs, 60);
    }

    #[tokio::test]
    async fn test_requests_over_budget_are_rejected() {
        let mut app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(limiter(2), rate_limit_layer));

        for remaining in ["1", "0"] {
            let response = app
                .call(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-ratelimit-limit"], "2");
            assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
        }

        let response = app
            .call(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get("retry-after").is_some());
    }
}
