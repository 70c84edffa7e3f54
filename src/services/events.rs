//! Event lifecycle service
//!
//! Creation, moderation, the completion-proof workflow, listings, registrant
//! decisions and the per-viewer status view.

use std::collections::BTreeSet;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::config::PointsConfig;
use crate::database::EventStore;
use crate::models::{
    ChangeKind, City, CompletionStatus, CreateEventRequest, Event, EventChange, EventFilter, EventId, EventStatus,
    JoinedEvent, NewEvent, Registration, RegistrationStatus, User,
};
use crate::services::feed::EventFeed;
use crate::services::image_host::{ImageHostClient, ImageUpload};
use crate::status::{EventView, Viewer};
use crate::utils::errors::{GoLoopError, Result};
use crate::utils::logging::{log_admin_action, log_event_action};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationDecision {
    Approve,
    Reject,
}

/// Partitions of the admin dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminBucket {
    Pending,
    Upcoming,
    Past,
    Rejected,
}

impl AdminBucket {
    pub fn filter(self, now: DateTime<Utc>) -> EventFilter {
        match self {
            AdminBucket::Pending => EventFilter::Pending,
            AdminBucket::Upcoming => EventFilter::UpcomingApproved { now },
            AdminBucket::Past => EventFilter::PastApproved { now },
            AdminBucket::Rejected => EventFilter::Rejected,
        }
    }
}

/// Events created by and joined by one user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyEvents {
    pub created: Vec<Event>,
    pub joined: Vec<JoinedEvent>,
}

fn validate_new_event(request: &CreateEventRequest, now: DateTime<Utc>) -> Result<()> {
    let required = [
        ("title", &request.title),
        ("organizer", &request.organizer),
        ("locationDetail", &request.location_detail),
        ("description", &request.description),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(GoLoopError::InvalidInput(format!("{} is required", field)));
    }

    if request.capacity <= 0 {
        return Err(GoLoopError::InvalidInput("capacity must be positive".to_string()));
    }

    if request.date_time <= now {
        return Err(GoLoopError::InvalidInput("dateTime must be in the future".to_string()));
    }

    Ok(())
}

/// Proof may be submitted by the organizer of an approved event that has passed
fn check_proof_submission(event: &Event, user_id: &str, now: DateTime<Utc>) -> Result<()> {
    if !event.is_creator(user_id) {
        return Err(GoLoopError::PermissionDenied(
            "Only the organizer can submit completion proof".to_string(),
        ));
    }

    if event.status != EventStatus::Approved || !event.has_passed(now) {
        return Err(GoLoopError::InvalidStateTransition {
            from: event.status.to_string(),
            to: CompletionStatus::ProofSubmitted.to_string(),
        });
    }

    if event.completion_status != CompletionStatus::AwaitingProof {
        return Err(GoLoopError::InvalidStateTransition {
            from: event.completion_status.to_string(),
            to: CompletionStatus::ProofSubmitted.to_string(),
        });
    }

    Ok(())
}

fn ensure_can_manage(event: &Event, caller: &User) -> Result<()> {
    if caller.is_admin() || event.is_creator(&caller.uid) {
        Ok(())
    } else {
        Err(GoLoopError::PermissionDenied(
            "Only the organizer or an admin can manage registrations".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn EventStore>,
    feed: EventFeed,
    image_host: Option<ImageHostClient>,
    awards: PointsConfig,
}

impl EventService {
    pub fn new(store: Arc<dyn EventStore>, feed: EventFeed, image_host: Option<ImageHostClient>, awards: PointsConfig) -> Self {
        Self { store, feed, image_host, awards }
    }

    /// Create an event awaiting moderation
    pub async fn create_event(&self, creator: &User, request: CreateEventRequest) -> Result<Event> {
        validate_new_event(&request, Utc::now())?;

        let event = self
            .store
            .create_event(NewEvent {
                request,
                creator_id: creator.uid.clone(),
                organizer_points: self.awards.organizer_award,
                participant_points: self.awards.participant_award,
            })
            .await?;

        log_event_action(event.id, "create", &creator.uid, Some(&event.title));
        self.publish(event.id, ChangeKind::Created).await;
        Ok(event)
    }

    pub async fn get_event(&self, event_id: EventId) -> Result<Event> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or(GoLoopError::EventNotFound { event_id })
    }

    /// Approved events for the browse page
    pub async fn list_approved(&self, location: Option<City>) -> Result<Vec<Event>> {
        self.store.list_events(&EventFilter::Approved { location }).await
    }

    /// Cities that currently have approved events
    pub async fn locations(&self) -> Result<Vec<City>> {
        let events = self.list_approved(None).await?;
        let cities: BTreeSet<City> = events.into_iter().map(|e| e.location).collect();
        Ok(cities.into_iter().collect())
    }

    pub async fn admin_events(&self, bucket: AdminBucket) -> Result<Vec<Event>> {
        self.store.list_events(&bucket.filter(Utc::now())).await
    }

    /// Events whose completion proof waits for review
    pub async fn pending_completions(&self) -> Result<Vec<Event>> {
        self.store.list_events(&EventFilter::ProofSubmitted).await
    }

    pub async fn moderate(&self, event_id: EventId, decision: ModerationDecision, admin: &User) -> Result<Event> {
        let target = match decision {
            ModerationDecision::Approve => EventStatus::Approved,
            ModerationDecision::Reject => EventStatus::Rejected,
        };

        let event = self
            .store
            .modify_event(event_id, &move |event: &mut Event| {
                if event.status != EventStatus::Pending {
                    return Err(GoLoopError::InvalidStateTransition {
                        from: event.status.to_string(),
                        to: target.to_string(),
                    });
                }
                event.status = target;
                Ok(())
            })
            .await?;

        log_admin_action(&admin.uid, "moderate_event", Some(&event_id.to_string()), Some(&target.to_string()));
        self.publish(event_id, ChangeKind::Moderated).await;
        Ok(event)
    }

    /// Upload completion proof and move the event to review
    pub async fn submit_proof(&self, event_id: EventId, organizer: &User, image: ImageUpload) -> Result<Event> {
        let image_host = self
            .image_host
            .as_ref()
            .ok_or_else(|| GoLoopError::ServiceUnavailable("Proof uploads are disabled".to_string()))?;

        // Refuse early so a doomed request never reaches the image host
        let current = self.get_event(event_id).await?;
        check_proof_submission(&current, &organizer.uid, Utc::now())?;

        let url = image_host.upload(image).await?;
        self.attach_proof(event_id, organizer, url).await
    }

    /// Record an already hosted proof image
    pub async fn attach_proof(&self, event_id: EventId, organizer: &User, url: String) -> Result<Event> {
        let uid = organizer.uid.clone();
        let event = self
            .store
            .modify_event(event_id, &move |event: &mut Event| {
                check_proof_submission(event, &uid, Utc::now())?;
                event.completion_status = CompletionStatus::ProofSubmitted;
                event.completion_proof_image_url = Some(url.clone());
                Ok(())
            })
            .await?;

        log_event_action(event_id, "submit_proof", &organizer.uid, event.completion_proof_image_url.as_deref());
        self.publish(event_id, ChangeKind::ProofSubmitted).await;
        Ok(event)
    }

    /// Send the proof back to the organizer
    pub async fn reject_proof(&self, event_id: EventId, admin: &User) -> Result<Event> {
        let event = self
            .store
            .modify_event(event_id, &|event: &mut Event| {
                if event.completion_status != CompletionStatus::ProofSubmitted {
                    return Err(GoLoopError::InvalidStateTransition {
                        from: event.completion_status.to_string(),
                        to: CompletionStatus::AwaitingProof.to_string(),
                    });
                }
                event.completion_status = CompletionStatus::AwaitingProof;
                event.completion_proof_image_url = None;
                Ok(())
            })
            .await?;

        log_admin_action(&admin.uid, "reject_proof", Some(&event_id.to_string()), None);
        self.publish(event_id, ChangeKind::ProofRejected).await;
        Ok(event)
    }

    pub async fn registrations(&self, event_id: EventId, caller: &User) -> Result<Vec<Registration>> {
        let event = self.get_event(event_id).await?;
        ensure_can_manage(&event, caller)?;
        self.store.list_registrations(event_id).await
    }

    /// Set an individual registrant's status; slots are never released
    pub async fn decide_registration(&self, event_id: EventId, user_id: &str, status: RegistrationStatus, caller: &User) -> Result<Registration> {
        let event = self.get_event(event_id).await?;
        ensure_can_manage(&event, caller)?;

        let registration = self.store.set_registration_status(event_id, user_id, status).await?;
        info!(event_id = %event_id, user_id = %user_id, status = %status, decided_by = %caller.uid, "Registration status updated");

        self.publish(event_id, ChangeKind::RegistrationUpdated { user_id: user_id.to_string() }).await;
        Ok(registration)
    }

    pub async fn my_events(&self, user_id: &str) -> Result<MyEvents> {
        let created = self
            .store
            .list_events(&EventFilter::CreatedBy { user_id: user_id.to_string() })
            .await?;
        let joined = self.store.joined_events(user_id).await?;
        Ok(MyEvents { created, joined })
    }

    /// Status view of one event for an optional viewer
    pub async fn status_view(&self, event_id: EventId, viewer_id: Option<&str>) -> Result<EventView> {
        let event = self.store.get_event(event_id).await?;
        let Some(event) = event else {
            debug!(event_id = %event_id, "Status requested for unknown event");
            return Ok(EventView::NotFound);
        };

        let viewer = match viewer_id {
            Some(user_id) => Viewer::Known {
                user_id: user_id.to_string(),
                registration: self.store.get_registration(event_id, user_id).await?,
            },
            None => Viewer::Anonymous,
        };

        Ok(EventView::reduce(Some(&event), Utc::now(), &viewer))
    }

    async fn publish(&self, event_id: EventId, kind: ChangeKind) {
        self.feed.publish(EventChange { event_id, kind }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn request(date_time: DateTime<Utc>, capacity: i32) -> CreateEventRequest {
        CreateEventRequest {
            title: "Beach clean-up".to_string(),
            organizer: "Komunitas Pantai".to_string(),
            location: City::Denpasar,
            location_detail: "Sanur".to_string(),
            description: "Bring gloves".to_string(),
            image_url: None,
            date_time,
            capacity,
        }
    }

    #[test]
    fn test_new_event_validation() {
        let now = Utc::now();
        assert!(validate_new_event(&request(now + Duration::days(1), 10), now).is_ok());
        assert_matches!(validate_new_event(&request(now - Duration::days(1), 10), now), Err(GoLoopError::InvalidInput(_)));
        assert_matches!(validate_new_event(&request(now + Duration::days(1), 0), now), Err(GoLoopError::InvalidInput(_)));

        let mut blank = request(now + Duration::days(1), 10);
        blank.title = "   ".to_string();
        assert_matches!(validate_new_event(&blank, now), Err(GoLoopError::InvalidInput(msg)) if msg.contains("title"));
    }

    #[test]
    fn test_admin_bucket_filters() {
        let now = Utc::now();
        assert_eq!(AdminBucket::Pending.filter(now), EventFilter::Pending);
        assert_eq!(AdminBucket::Past.filter(now), EventFilter::PastApproved { now });
        assert_eq!(AdminBucket::Upcoming.filter(now), EventFilter::UpcomingApproved { now });
    }
}
