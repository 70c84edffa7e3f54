//! GoLoop
//!
//! Community clean-up events: creation and moderation, capacity-safe
//! registration, completion proof review and an idempotent points payout,
//! served over HTTP with live status updates.

pub mod api;
pub mod config;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod status;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{GoLoopError, Result};

// Re-export main components for easy access
pub use api::{build_router, AppState};
pub use database::{DatabaseService, EventStore, MemoryStore};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
