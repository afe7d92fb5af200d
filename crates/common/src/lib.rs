//! Common utilities shared across the badgeboard services.
//!
//! This crate provides the ambient concerns of the workspace:
//! - Telemetry and structured logging setup
//! - Retry policy with exponential backoff

pub mod retry;
pub mod telemetry;

// Re-export commonly used types
pub use retry::RetryPolicy;
pub use telemetry::init_tracing;
