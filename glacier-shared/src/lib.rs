//! # Glacier Shared Library
//!
//! This crate contains the types, persistence and business rules shared by
//! the Glacier API server and the background worker.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and embedded migrations
//! - `auth`: Passwords, sessions, reset tokens and team authorization
//! - `models`: Database models and their queries
//! - `email`: SMTP mailer and message templates
//! - `redis`: Redis connection wrapper

pub mod auth;
pub mod db;
pub mod email;
pub mod models;
pub mod redis;

/// Current version of the Glacier shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default product name used in emails and subjects
pub const DEFAULT_APP_NAME: &str = "Glacier";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
