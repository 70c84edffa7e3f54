//! Registration model
//!
//! A registration is keyed by `(event_id, user_id)`; its existence is the sole
//! record of a user having registered. `display_name` and `photo_url` are a
//! snapshot taken at registration time and are not refreshed when the user's
//! profile changes later.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use super::event::{Event, EventId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "registration_status", rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub event_id: EventId,
    pub user_id: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
}

/// Input of the registration transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterParticipantRequest {
    pub event_id: EventId,
    pub user_id: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Result of a registration attempt that passed every precondition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub registration: Registration,
    /// `false` when the user was already registered and nothing was written
    pub created: bool,
}

/// An event the user joined, with that user's registration status
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JoinedEvent {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub event: Event,
    pub registration_status: RegistrationStatus,
}
