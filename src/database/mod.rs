//! Database module
//!
//! This module handles database connections, the store seam used by the
//! services, and its PostgreSQL and in-memory implementations

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod retry;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, create_pool, run_migrations, health_check};
pub use memory::MemoryStore;
pub use repositories::{UserRepository, EventRepository, RegistrationRepository};
pub use service::DatabaseService;
pub use store::{EventMutation, EventStore};
