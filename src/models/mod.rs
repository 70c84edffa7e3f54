//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod user;
pub mod event;
pub mod registration;

// Re-export commonly used models
pub use user::{User, UserRole, CreateUserRequest, UpdateUserRequest};
pub use event::{Event, EventId, City, EventStatus, CompletionStatus, CreateEventRequest, NewEvent, EventFilter, EventChange, ChangeKind};
pub use registration::{Registration, RegistrationStatus, RegisterParticipantRequest, RegistrationOutcome, JoinedEvent};
