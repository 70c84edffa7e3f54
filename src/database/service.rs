//! Database service layer
//!
//! PostgreSQL implementation of [`EventStore`]. Every transaction locks the
//! event row first (`SELECT ... FOR UPDATE`), so concurrent registrations and
//! payouts for one event are serialized by the database and preconditions
//! are always evaluated against the committed state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::database::{DatabasePool, EventRepository, RegistrationRepository, UserRepository};
use crate::database::retry::{with_retries, RetryPolicy};
use crate::database::store::{EventMutation, EventStore};
use crate::models::*;
use crate::services::points::{plan_distribution, DistributionReceipt};
use crate::services::registration::{admit, Admission};
use crate::utils::errors::{GoLoopError, Result};

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    retry: RetryPolicy,
    pub users: UserRepository,
    pub events: EventRepository,
    pub registrations: RegistrationRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool, transaction_retries: u32) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            retry: RetryPolicy::new(transaction_retries),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    async fn register_once(&self, request: &RegisterParticipantRequest, now: DateTime<Utc>) -> Result<RegistrationOutcome> {
        let mut tx = self.pool.begin().await?;

        let event = EventRepository::lock(&mut *tx, request.event_id)
            .await?
            .ok_or(GoLoopError::EventNotFound { event_id: request.event_id })?;
        let existing = RegistrationRepository::find(&mut *tx, event.id, &request.user_id).await?;

        match admit(&event, existing.as_ref(), request, now)? {
            Admission::AlreadyRegistered(registration) => {
                tx.rollback().await?;
                Ok(RegistrationOutcome {
                    registration,
                    created: false,
                })
            }
            Admission::Admit(registration) => {
                let registration = RegistrationRepository::insert(&mut *tx, &registration).await?;
                EventRepository::increment_registered(&mut *tx, event.id).await?;
                tx.commit().await?;

                Ok(RegistrationOutcome {
                    registration,
                    created: true,
                })
            }
        }
    }

    async fn distribute_once(&self, event_id: EventId) -> Result<DistributionReceipt> {
        let mut tx = self.pool.begin().await?;

        let event = EventRepository::lock(&mut *tx, event_id)
            .await?
            .ok_or(GoLoopError::EventNotFound { event_id })?;
        let registrations = RegistrationRepository::lock_for_event(&mut *tx, event_id).await?;
        let plan = plan_distribution(&event, &registrations)?;

        // Dropping `tx` on any early return rolls back the increments already applied
        for (uid, delta) in &plan.credits {
            if UserRepository::add_points(&mut *tx, uid, *delta).await? == 0 {
                return Err(GoLoopError::UserNotFound { user_id: uid.clone() });
            }
        }

        let event = EventRepository::mark_completed(&mut *tx, event_id).await?;
        tx.commit().await?;

        Ok(DistributionReceipt {
            organizer_points: i64::from(event.organizer_points),
            participant_points: i64::from(event.participant_points),
            participants_credited: plan.participants,
            event,
        })
    }

    async fn modify_once(&self, event_id: EventId, mutation: &EventMutation) -> Result<Event> {
        let mut tx = self.pool.begin().await?;

        let mut event = EventRepository::lock(&mut *tx, event_id)
            .await?
            .ok_or(GoLoopError::EventNotFound { event_id })?;
        mutation(&mut event)?;

        let event = EventRepository::update_workflow(&mut *tx, &event).await?;
        tx.commit().await?;
        Ok(event)
    }
}

#[async_trait]
impl EventStore for DatabaseService {
    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        self.events.create(event).await
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>> {
        self.events.find_by_id(event_id).await
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.events.list(filter).await
    }

    async fn modify_event(&self, event_id: EventId, mutation: &EventMutation) -> Result<Event> {
        with_retries(self.retry, "modify_event", || self.modify_once(event_id, mutation)).await
    }

    async fn register(&self, request: &RegisterParticipantRequest, now: DateTime<Utc>) -> Result<RegistrationOutcome> {
        with_retries(self.retry, "register", || self.register_once(request, now)).await
    }

    async fn get_registration(&self, event_id: EventId, user_id: &str) -> Result<Option<Registration>> {
        self.registrations.get(event_id, user_id).await
    }

    async fn list_registrations(&self, event_id: EventId) -> Result<Vec<Registration>> {
        self.registrations.list_for_event(event_id).await
    }

    async fn set_registration_status(&self, event_id: EventId, user_id: &str, status: RegistrationStatus) -> Result<Registration> {
        self.registrations
            .update_status(event_id, user_id, status)
            .await?
            .ok_or_else(|| GoLoopError::RegistrationNotFound {
                event_id,
                user_id: user_id.to_string(),
            })
    }

    async fn joined_events(&self, user_id: &str) -> Result<Vec<JoinedEvent>> {
        self.registrations.joined_by_user(user_id).await
    }

    async fn distribute_points(&self, event_id: EventId) -> Result<DistributionReceipt> {
        with_retries(self.retry, "distribute_points", || self.distribute_once(event_id)).await
    }

    async fn get_user(&self, uid: &str) -> Result<Option<User>> {
        self.users.find_by_uid(uid).await
    }

    async fn ensure_user(&self, request: CreateUserRequest) -> Result<User> {
        self.users.create_if_absent(request).await
    }

    async fn update_user(&self, uid: &str, request: UpdateUserRequest) -> Result<User> {
        self.users
            .update(uid, request)
            .await?
            .ok_or_else(|| GoLoopError::UserNotFound { user_id: uid.to_string() })
    }

    async fn top_users(&self, limit: i64) -> Result<Vec<User>> {
        self.users.top_by_points(limit).await
    }

    async fn health_check(&self) -> Result<()> {
        super::connection::health_check(&self.pool).await
    }
}
