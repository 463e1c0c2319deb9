/// Middleware modules for the API server
///
/// - `security`: hardening headers on every response
/// - `rate_limit`: per-IP fixed-window limiting for `/api`
///
/// Session authentication lives in `glacier_shared::auth::middleware` so
/// that the realtime endpoint can share it.

pub mod rate_limit;
pub mod security;
