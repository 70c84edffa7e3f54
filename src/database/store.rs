//! Store seam
//!
//! Everything the services need from persistence. Multi-row operations
//! (`register`, `distribute_points`, `modify_event`) are atomic: either all of
//! their writes are visible afterwards or none are.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::models::{
    CreateUserRequest, Event, EventFilter, EventId, JoinedEvent, NewEvent, RegisterParticipantRequest,
    Registration, RegistrationOutcome, RegistrationStatus, UpdateUserRequest, User,
};
use crate::services::points::DistributionReceipt;
use crate::utils::errors::Result;

/// Read-modify-write step applied to a locked event
pub type EventMutation = dyn Fn(&mut Event) -> Result<()> + Send + Sync;

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: NewEvent) -> Result<Event>;

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>>;

    /// Events matching `filter`, newest `date_time` first
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    /// Apply `mutation` to the event inside one transaction
    ///
    /// Only `status`, `completion_status` and `completion_proof_image_url` are
    /// persisted; counters and the payout flag belong to their own operations.
    async fn modify_event(&self, event_id: EventId, mutation: &EventMutation) -> Result<Event>;

    /// Admit a registrant without ever exceeding capacity
    async fn register(&self, request: &RegisterParticipantRequest, now: DateTime<Utc>) -> Result<RegistrationOutcome>;

    async fn get_registration(&self, event_id: EventId, user_id: &str) -> Result<Option<Registration>>;

    /// Registrations of one event, oldest first
    async fn list_registrations(&self, event_id: EventId) -> Result<Vec<Registration>>;

    /// Change an individual registrant's status; `registered` is left untouched
    async fn set_registration_status(&self, event_id: EventId, user_id: &str, status: RegistrationStatus) -> Result<Registration>;

    async fn joined_events(&self, user_id: &str) -> Result<Vec<JoinedEvent>>;

    /// Credit organizer and approved participants, then mark the event completed
    async fn distribute_points(&self, event_id: EventId) -> Result<DistributionReceipt>;

    async fn get_user(&self, uid: &str) -> Result<Option<User>>;

    /// Return the stored user, creating it from `request` on first sight
    async fn ensure_user(&self, request: CreateUserRequest) -> Result<User>;

    async fn update_user(&self, uid: &str, request: UpdateUserRequest) -> Result<User>;

    /// Users ordered by points, highest first
    async fn top_users(&self, limit: i64) -> Result<Vec<User>>;

    async fn health_check(&self) -> Result<()>;
}
