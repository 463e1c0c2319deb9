/// Redis integration
///
/// Redis is optional. When `REDIS_URL` is set, the API keeps its
/// rate-limit windows here so that several API processes share one budget
/// per client; otherwise the windows live in process memory.
///
/// ```text
/// ┌─────────────┐  EVAL (INCR + EXPIRE)   ┌───────────────┐
/// │ API process │ ──────────────────────> │ rl:{client ip}│
/// └─────────────┘ <── {count, ttl} ────── └───────────────┘
/// ```

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig, WindowHit};
