//! # Glacier API Server Library
//!
//! HTTP and WebSocket front end of Glacier, a team task tracker.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Rate limiting and security headers
//! - `notify`: Notifications and emails fired by task events
//! - `realtime`: Team chat rooms and the `/ws` socket
//! - `routes`: API route handlers
//! - `storage`: Attachment storage backends

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod notify;
pub mod realtime;
pub mod routes;
pub mod storage;
