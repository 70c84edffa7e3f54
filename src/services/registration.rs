//! Registration Transaction
//!
//! [`admit`] holds every precondition of a registration and is evaluated by the
//! store inside its transaction, against the locked event row. The service
//! wraps it with rate limiting, logging and change notification.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use crate::database::EventStore;
use crate::middleware::rate_limit::RegistrationLimiter;
use crate::models::{ChangeKind, Event, EventChange, EventId, EventStatus, RegisterParticipantRequest, Registration, RegistrationOutcome, RegistrationStatus};
use crate::services::feed::EventFeed;
use crate::utils::errors::{GoLoopError, Result};

/// Decision taken for one registration attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Write this registration and take one slot
    Admit(Registration),
    /// The user already holds a registration; nothing is written
    AlreadyRegistered(Registration),
}

/// Check every registration precondition against a consistent snapshot
///
/// `existing` is the registration stored under `(event.id, request.user_id)`,
/// read in the same transaction as `event`.
pub fn admit(
    event: &Event,
    existing: Option<&Registration>,
    request: &RegisterParticipantRequest,
    now: DateTime<Utc>,
) -> Result<Admission> {
    if let Some(registration) = existing {
        return Ok(Admission::AlreadyRegistered(registration.clone()));
    }

    if event.status != EventStatus::Approved {
        return Err(GoLoopError::RegistrationClosed {
            event_id: event.id,
            reason: format!("event is {}", event.status),
        });
    }

    if event.has_passed(now) {
        return Err(GoLoopError::RegistrationClosed {
            event_id: event.id,
            reason: "event has already started".to_string(),
        });
    }

    if event.is_creator(&request.user_id) {
        return Err(GoLoopError::PermissionDenied(
            "Organizers cannot register for their own event".to_string(),
        ));
    }

    if event.registered >= event.capacity {
        return Err(GoLoopError::CapacityExceeded { event_id: event.id });
    }

    Ok(Admission::Admit(Registration {
        event_id: event.id,
        user_id: request.user_id.clone(),
        display_name: request.display_name.clone(),
        photo_url: request.photo_url.clone(),
        status: RegistrationStatus::Pending,
        registered_at: now,
    }))
}

/// Registration service
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn EventStore>,
    feed: EventFeed,
    limiter: Arc<RegistrationLimiter>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn EventStore>, feed: EventFeed, limiter: Arc<RegistrationLimiter>) -> Self {
        Self { store, feed, limiter }
    }

    /// Register a user for an event
    pub async fn register(&self, request: RegisterParticipantRequest) -> Result<RegistrationOutcome> {
        self.limiter.check(&request.user_id)?;

        let event_id = request.event_id;
        let user_id = request.user_id.clone();

        let outcome = match self.store.register(&request, Utc::now()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(event_id = %event_id, user_id = %user_id, kind = e.kind(), "Registration refused: {}", e);
                return Err(e);
            }
        };

        if outcome.created {
            info!(event_id = %event_id, user_id = %user_id, "User registered for event");
            self.feed
                .publish(EventChange {
                    event_id,
                    kind: ChangeKind::Registered { user_id },
                })
                .await;
        } else {
            debug!(event_id = %event_id, user_id = %user_id, "Repeated registration, returning existing record");
        }

        Ok(outcome)
    }

    pub async fn get_registration(&self, event_id: EventId, user_id: &str) -> Result<Option<Registration>> {
        self.store.get_registration(event_id, user_id).await
    }
}
