//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

pub type EventId = Uuid;

/// Cities an event can be held in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "city", rename_all = "lowercase")]
pub enum City {
    Jakarta,
    Surabaya,
    Bandung,
    Medan,
    Makassar,
    Semarang,
    Yogyakarta,
    Denpasar,
}

impl City {
    pub const ALL: [City; 8] = [
        City::Jakarta,
        City::Surabaya,
        City::Bandung,
        City::Medan,
        City::Makassar,
        City::Semarang,
        City::Yogyakarta,
        City::Denpasar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            City::Jakarta => "Jakarta",
            City::Surabaya => "Surabaya",
            City::Bandung => "Bandung",
            City::Medan => "Medan",
            City::Makassar => "Makassar",
            City::Semarang => "Semarang",
            City::Yogyakarta => "Yogyakarta",
            City::Denpasar => "Denpasar",
        }
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for City {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        City::ALL
            .iter()
            .copied()
            .find(|city| city.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown city: {}", s))
    }
}

/// Admin moderation of the event's existence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

/// Completion-proof workflow, meaningful once an approved event has passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "completion_status", rename_all = "snake_case")]
pub enum CompletionStatus {
    AwaitingProof,
    ProofSubmitted,
    Completed,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompletionStatus::AwaitingProof => "awaiting_proof",
            CompletionStatus::ProofSubmitted => "proof_submitted",
            CompletionStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub organizer: String,
    pub location: City,
    pub location_detail: String,
    pub description: String,
    pub image_url: Option<String>,
    pub date_time: DateTime<Utc>,
    pub capacity: i32,
    pub registered: i32,
    pub status: EventStatus,
    pub completion_status: CompletionStatus,
    pub completion_proof_image_url: Option<String>,
    pub points_distributed: bool,
    pub organizer_points: i32,
    pub participant_points: i32,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// An event has passed once its start instant is reached
    pub fn has_passed(&self, now: DateTime<Utc>) -> bool {
        now >= self.date_time
    }

    pub fn is_full(&self) -> bool {
        self.registered >= self.capacity
    }

    pub fn spots_left(&self) -> i32 {
        (self.capacity - self.registered).max(0)
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.creator_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub organizer: String,
    pub location: City,
    pub location_detail: String,
    pub description: String,
    pub image_url: Option<String>,
    pub date_time: DateTime<Utc>,
    pub capacity: i32,
}

/// Fully resolved event ready to be stored
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub request: CreateEventRequest,
    pub creator_id: String,
    pub organizer_points: i32,
    pub participant_points: i32,
}

/// Listing filters used by the browse page and the admin dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    /// Approved events, optionally restricted to one city
    Approved { location: Option<City> },
    /// Events awaiting moderation
    Pending,
    /// Approved events starting after the given instant
    UpcomingApproved { now: DateTime<Utc> },
    /// Approved events that started at or before the given instant
    PastApproved { now: DateTime<Utc> },
    Rejected,
    /// Events whose completion proof waits for review
    ProofSubmitted,
    CreatedBy { user_id: String },
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            EventFilter::Approved { location } => {
                event.status == EventStatus::Approved
                    && location.map_or(true, |city| event.location == city)
            }
            EventFilter::Pending => event.status == EventStatus::Pending,
            EventFilter::UpcomingApproved { now } => {
                event.status == EventStatus::Approved && event.date_time > *now
            }
            EventFilter::PastApproved { now } => {
                event.status == EventStatus::Approved && event.date_time <= *now
            }
            EventFilter::Rejected => event.status == EventStatus::Rejected,
            EventFilter::ProofSubmitted => event.completion_status == CompletionStatus::ProofSubmitted,
            EventFilter::CreatedBy { user_id } => event.creator_id == *user_id,
        }
    }
}

/// Notification that an event or one of its registrations changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChange {
    pub event_id: EventId,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ChangeKind {
    Created,
    Moderated,
    Registered { user_id: String },
    RegistrationUpdated { user_id: String },
    ProofSubmitted,
    ProofRejected,
    Completed,
}

impl EventChange {
    /// Whether this change touches the given viewer's registration
    pub fn concerns_user(&self, user_id: &str) -> bool {
        match &self.kind {
            ChangeKind::Registered { user_id: id } | ChangeKind::RegistrationUpdated { user_id: id } => id == user_id,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_parsing_is_case_insensitive() {
        assert_eq!("jakarta".parse::<City>(), Ok(City::Jakarta));
        assert_eq!(" Yogyakarta ".parse::<City>(), Ok(City::Yogyakarta));
        assert!("Atlantis".parse::<City>().is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&CompletionStatus::ProofSubmitted).unwrap(), "\"proof_submitted\"");
        assert_eq!(serde_json::to_string(&EventStatus::Approved).unwrap(), "\"approved\"");
        assert_eq!(serde_json::to_string(&City::Denpasar).unwrap(), "\"Denpasar\"");
    }
}
