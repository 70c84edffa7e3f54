//! Error handling for GoLoop
//!
//! This module defines the main error type used throughout the application.
//! Every variant belongs to exactly one [`ErrorClass`], which decides whether
//! the failure may be retried and how it is surfaced to the caller.

use thiserror::Error;
use crate::models::EventId;

/// Main error type for GoLoop
#[derive(Error, Debug)]
pub enum GoLoopError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Image host error: {0}")]
    ImageHost(#[from] ImageHostError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event {event_id} is at capacity")]
    CapacityExceeded { event_id: EventId },

    #[error("Points for event {event_id} were already distributed")]
    AlreadyDistributed { event_id: EventId },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: EventId },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("Registration of {user_id} for event {event_id} not found")]
    RegistrationNotFound { event_id: EventId, user_id: String },

    #[error("Registration for event {event_id} is closed: {reason}")]
    RegistrationClosed { event_id: EventId, reason: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Image host specific errors
#[derive(Error, Debug)]
pub enum ImageHostError {
    #[error("Upload request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Image host rejected the upload with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid image host response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for GoLoop operations
pub type Result<T> = std::result::Result<T, GoLoopError>;

/// Failure classes, each with its own retry and reporting policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A business precondition did not hold; never retried automatically
    Precondition,
    /// Network, storage or conflict failure; safe to retry
    Transient,
    /// Caller is unknown or lacks permission; surfaced as-is
    Authorization,
    /// Caller sent something malformed
    InvalidInput,
    /// Misconfiguration or a bug
    Internal,
}

impl GoLoopError {
    pub fn class(&self) -> ErrorClass {
        match self {
            GoLoopError::CapacityExceeded { .. }
            | GoLoopError::AlreadyDistributed { .. }
            | GoLoopError::EventNotFound { .. }
            | GoLoopError::UserNotFound { .. }
            | GoLoopError::RegistrationNotFound { .. }
            | GoLoopError::RegistrationClosed { .. }
            | GoLoopError::InvalidStateTransition { .. } => ErrorClass::Precondition,
            GoLoopError::Database(e) if is_transient_sqlx(e) => ErrorClass::Transient,
            GoLoopError::Redis(_)
            | GoLoopError::ImageHost(ImageHostError::RequestFailed(_))
            | GoLoopError::RateLimitExceeded
            | GoLoopError::ServiceUnavailable(_) => ErrorClass::Transient,
            GoLoopError::Authentication(_) | GoLoopError::PermissionDenied(_) => ErrorClass::Authorization,
            GoLoopError::InvalidInput(_) | GoLoopError::PayloadTooLarge(_) => ErrorClass::InvalidInput,
            GoLoopError::Database(_)
            | GoLoopError::Migration(_)
            | GoLoopError::ImageHost(_)
            | GoLoopError::Serialization(_)
            | GoLoopError::Io(_)
            | GoLoopError::Config(_) => ErrorClass::Internal,
        }
    }

    /// Check if the caller may retry the whole operation
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self.class() {
            ErrorClass::Precondition | ErrorClass::InvalidInput => ErrorSeverity::Info,
            ErrorClass::Authorization => ErrorSeverity::Warning,
            ErrorClass::Transient => ErrorSeverity::Error,
            ErrorClass::Internal => ErrorSeverity::Critical,
        }
    }

    /// Stable machine-readable error code
    pub fn kind(&self) -> &'static str {
        match self {
            GoLoopError::Database(_) => "DATABASE",
            GoLoopError::Migration(_) => "MIGRATION",
            GoLoopError::Redis(_) => "REDIS",
            GoLoopError::ImageHost(_) => "IMAGE_HOST",
            GoLoopError::Serialization(_) => "SERIALIZATION",
            GoLoopError::Io(_) => "IO",
            GoLoopError::Config(_) => "CONFIG",
            GoLoopError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            GoLoopError::AlreadyDistributed { .. } => "ALREADY_DISTRIBUTED",
            GoLoopError::EventNotFound { .. } => "EVENT_NOT_FOUND",
            GoLoopError::UserNotFound { .. } => "USER_NOT_FOUND",
            GoLoopError::RegistrationNotFound { .. } => "REGISTRATION_NOT_FOUND",
            GoLoopError::RegistrationClosed { .. } => "REGISTRATION_CLOSED",
            GoLoopError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            GoLoopError::Authentication(_) => "UNAUTHENTICATED",
            GoLoopError::PermissionDenied(_) => "FORBIDDEN",
            GoLoopError::RateLimitExceeded => "RATE_LIMITED",
            GoLoopError::InvalidInput(_) => "INVALID_INPUT",
            GoLoopError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            GoLoopError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

/// Optimistic-concurrency conflicts and lost connections
pub fn is_transient_sqlx(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("40001") | Some("40P01")),
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
        _ => false,
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_preconditions_are_not_retryable() {
        let event_id = Uuid::new_v4();
        let errors = [
            GoLoopError::CapacityExceeded { event_id },
            GoLoopError::AlreadyDistributed { event_id },
            GoLoopError::EventNotFound { event_id },
        ];
        for error in errors {
            assert_eq!(error.class(), ErrorClass::Precondition);
            assert!(!error.is_retryable());
            assert_eq!(error.severity(), ErrorSeverity::Info);
        }
    }

    #[test]
    fn test_authorization_errors_are_warnings() {
        let error = GoLoopError::PermissionDenied("admins only".to_string());
        assert_eq!(error.class(), ErrorClass::Authorization);
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert_eq!(error.kind(), "FORBIDDEN");
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let error = GoLoopError::Database(sqlx::Error::PoolTimedOut);
        assert!(error.is_retryable());

        let error = GoLoopError::Database(sqlx::Error::RowNotFound);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let event_id = Uuid::nil();
        let error = GoLoopError::CapacityExceeded { event_id };
        assert_eq!(error.to_string(), format!("Event {} is at capacity", event_id));
    }
}
