//! In-memory store
//!
//! Holds all documents behind one async mutex, so every operation is trivially
//! atomic. Used by the test suite and for running the API without PostgreSQL.

use std::collections::{BTreeMap, HashMap};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;
use crate::models::{
    CompletionStatus, CreateUserRequest, Event, EventFilter, EventId, EventStatus, JoinedEvent, NewEvent,
    RegisterParticipantRequest, Registration, RegistrationOutcome, RegistrationStatus, UpdateUserRequest, User,
};
use crate::services::points::{plan_distribution, DistributionReceipt};
use crate::services::registration::{admit, Admission};
use crate::utils::errors::{GoLoopError, Result};
use super::store::{EventMutation, EventStore};

#[derive(Debug, Default)]
struct State {
    events: HashMap<EventId, Event>,
    registrations: BTreeMap<(EventId, String), Registration>,
    users: HashMap<String, User>,
}

impl State {
    fn registrations_of(&self, event_id: EventId) -> Vec<Registration> {
        let mut registrations: Vec<Registration> = self
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.registered_at);
        registrations
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an event verbatim, bypassing creation rules
    pub async fn put_event(&self, event: Event) {
        self.state.lock().await.events.insert(event.id, event);
    }

    /// Insert or replace a user verbatim
    pub async fn put_user(&self, user: User) {
        self.state.lock().await.users.insert(user.uid.clone(), user);
    }

    /// Number of stored registrations for an event
    pub async fn registration_count(&self, event_id: EventId) -> usize {
        self.state
            .lock()
            .await
            .registrations
            .keys()
            .filter(|(id, _)| *id == event_id)
            .count()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_event(&self, new_event: NewEvent) -> Result<Event> {
        let now = Utc::now();
        let request = new_event.request;
        let event = Event {
            id: Uuid::new_v4(),
            title: request.title,
            organizer: request.organizer,
            location: request.location,
            location_detail: request.location_detail,
            description: request.description,
            image_url: request.image_url,
            date_time: request.date_time,
            capacity: request.capacity,
            registered: 0,
            status: EventStatus::Pending,
            completion_status: CompletionStatus::AwaitingProof,
            completion_proof_image_url: None,
            points_distributed: false,
            organizer_points: new_event.organizer_points,
            participant_points: new_event.participant_points,
            creator_id: new_event.creator_id,
            created_at: now,
            updated_at: now,
        };

        self.state.lock().await.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>> {
        Ok(self.state.lock().await.events.get(&event_id).cloned())
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state.events.values().filter(|e| filter.matches(e)).cloned().collect();
        events.sort_by(|a, b| b.date_time.cmp(&a.date_time));
        Ok(events)
    }

    async fn modify_event(&self, event_id: EventId, mutation: &EventMutation) -> Result<Event> {
        let mut state = self.state.lock().await;
        let stored = state
            .events
            .get_mut(&event_id)
            .ok_or(GoLoopError::EventNotFound { event_id })?;

        let mut draft = stored.clone();
        mutation(&mut draft)?;

        stored.status = draft.status;
        stored.completion_status = draft.completion_status;
        stored.completion_proof_image_url = draft.completion_proof_image_url;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn register(&self, request: &RegisterParticipantRequest, now: DateTime<Utc>) -> Result<RegistrationOutcome> {
        let mut state = self.state.lock().await;
        let key = (request.event_id, request.user_id.clone());

        let event = state
            .events
            .get(&request.event_id)
            .ok_or(GoLoopError::EventNotFound { event_id: request.event_id })?;

        match admit(event, state.registrations.get(&key), request, now)? {
            Admission::AlreadyRegistered(registration) => Ok(RegistrationOutcome {
                registration,
                created: false,
            }),
            Admission::Admit(registration) => {
                if let Some(event) = state.events.get_mut(&request.event_id) {
                    event.registered += 1;
                    event.updated_at = now;
                }
                state.registrations.insert(key, registration.clone());
                Ok(RegistrationOutcome {
                    registration,
                    created: true,
                })
            }
        }
    }

    async fn get_registration(&self, event_id: EventId, user_id: &str) -> Result<Option<Registration>> {
        let state = self.state.lock().await;
        Ok(state.registrations.get(&(event_id, user_id.to_string())).cloned())
    }

    async fn list_registrations(&self, event_id: EventId) -> Result<Vec<Registration>> {
        Ok(self.state.lock().await.registrations_of(event_id))
    }

    async fn set_registration_status(&self, event_id: EventId, user_id: &str, status: RegistrationStatus) -> Result<Registration> {
        let mut state = self.state.lock().await;
        let registration = state
            .registrations
            .get_mut(&(event_id, user_id.to_string()))
            .ok_or_else(|| GoLoopError::RegistrationNotFound {
                event_id,
                user_id: user_id.to_string(),
            })?;

        registration.status = status;
        Ok(registration.clone())
    }

    async fn joined_events(&self, user_id: &str) -> Result<Vec<JoinedEvent>> {
        let state = self.state.lock().await;
        let mut joined: Vec<JoinedEvent> = state
            .registrations
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                state.events.get(&r.event_id).map(|event| JoinedEvent {
                    event: event.clone(),
                    registration_status: r.status,
                })
            })
            .collect();
        joined.sort_by(|a, b| b.event.date_time.cmp(&a.event.date_time));
        Ok(joined)
    }

    async fn distribute_points(&self, event_id: EventId) -> Result<DistributionReceipt> {
        let mut state = self.state.lock().await;
        let event = state
            .events
            .get(&event_id)
            .ok_or(GoLoopError::EventNotFound { event_id })?;

        let plan = plan_distribution(event, &state.registrations_of(event_id))?;

        if let Some(missing) = plan.credits.keys().find(|uid| !state.users.contains_key(*uid)) {
            return Err(GoLoopError::UserNotFound { user_id: missing.clone() });
        }

        let now = Utc::now();
        for (uid, delta) in &plan.credits {
            if let Some(user) = state.users.get_mut(uid) {
                user.points += delta;
                user.updated_at = now;
            }
        }

        let event = state
            .events
            .get_mut(&event_id)
            .ok_or(GoLoopError::EventNotFound { event_id })?;
        event.completion_status = CompletionStatus::Completed;
        event.points_distributed = true;
        event.updated_at = now;

        Ok(DistributionReceipt {
            organizer_points: i64::from(event.organizer_points),
            participant_points: i64::from(event.participant_points),
            participants_credited: plan.participants,
            event: event.clone(),
        })
    }

    async fn get_user(&self, uid: &str) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(uid).cloned())
    }

    async fn ensure_user(&self, request: CreateUserRequest) -> Result<User> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let user = state.users.entry(request.uid.clone()).or_insert_with(|| User {
            uid: request.uid,
            display_name: request.display_name,
            email: request.email,
            photo_url: request.photo_url,
            location: None,
            role: request.role,
            points: 0,
            created_at: now,
            updated_at: now,
        });
        Ok(user.clone())
    }

    async fn update_user(&self, uid: &str, request: UpdateUserRequest) -> Result<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(uid)
            .ok_or_else(|| GoLoopError::UserNotFound { user_id: uid.to_string() })?;

        if let Some(display_name) = request.display_name {
            user.display_name = Some(display_name);
        }
        if let Some(location) = request.location {
            user.location = Some(location);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn top_users(&self, limit: i64) -> Result<Vec<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.uid.cmp(&b.uid)));
        users.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(users)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
