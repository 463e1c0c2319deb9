//! # Glacier Worker Library
//!
//! Background jobs for Glacier: the daily/weekly digest email and the
//! expired-session sweep.
//!
//! ## Modules
//!
//! - `config`: Configuration from the environment
//! - `schedule`: When digests run and which periods are due
//! - `digest`: Building and sending digest emails
//! - `runner`: The worker loop and graceful shutdown

pub mod config;
pub mod digest;
pub mod runner;
pub mod schedule;
