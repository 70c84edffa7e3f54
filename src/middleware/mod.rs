//! Middleware module
//!
//! This module contains request extraction, rate limiting and tracing

pub mod auth;
pub mod logging;
pub mod rate_limit;

// Re-export commonly used middleware
pub use auth::{AuthUser, MaybeAuthUser};
pub use logging::trace_layer;
pub use rate_limit::RegistrationLimiter;
