//! Shared types, errors, and configuration for Autoledger.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe holder, posting and obligation references
//! - The boundary error type (message plus classification)
//! - Configuration management
//! - Tracing initialisation
//! - The outbound SMS notification client

pub mod config;
pub mod error;
pub mod notify;
pub mod telemetry;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorClass};
pub use notify::{Notification, NotifyError, Notifier, SmsClient};
