//! Points Distribution Batch
//!
//! Credits the organizer and every approved participant of one event exactly
//! once. The guard flag, the point increments and the completion status land
//! in the same transaction; [`plan_distribution`] is evaluated by the store
//! against the locked event row.

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::Serialize;
use tracing::{info, warn};
use crate::database::EventStore;
use crate::models::{ChangeKind, CompletionStatus, Event, EventChange, EventId, EventStatus, Registration, RegistrationStatus};
use crate::services::feed::EventFeed;
use crate::services::redis::RedisService;
use crate::utils::errors::{GoLoopError, Result};
use crate::utils::logging::log_admin_action;

/// Point increments to apply for one event
///
/// Credits are keyed by user id; iterating the map yields a stable order so
/// concurrent batches lock user rows in the same sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsPlan {
    pub event_id: EventId,
    pub credits: BTreeMap<String, i64>,
    pub participants: usize,
}

impl PointsPlan {
    pub fn total_points(&self) -> i64 {
        self.credits.values().sum()
    }
}

/// Result of a committed batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionReceipt {
    pub event: Event,
    pub organizer_points: i64,
    pub participant_points: i64,
    pub participants_credited: usize,
}

/// Validate the guard and compute the increments
///
/// `registrations` may contain every registration of the event; only approved
/// ones are credited.
pub fn plan_distribution(event: &Event, registrations: &[Registration]) -> Result<PointsPlan> {
    if event.points_distributed {
        return Err(GoLoopError::AlreadyDistributed { event_id: event.id });
    }

    if event.status != EventStatus::Approved {
        return Err(GoLoopError::InvalidStateTransition {
            from: event.status.to_string(),
            to: CompletionStatus::Completed.to_string(),
        });
    }

    if event.completion_status != CompletionStatus::ProofSubmitted {
        return Err(GoLoopError::InvalidStateTransition {
            from: event.completion_status.to_string(),
            to: CompletionStatus::Completed.to_string(),
        });
    }

    let mut credits = BTreeMap::new();
    *credits.entry(event.creator_id.clone()).or_insert(0) += i64::from(event.organizer_points);

    let mut participants = 0;
    for registration in registrations
        .iter()
        .filter(|r| r.event_id == event.id && r.status == RegistrationStatus::Approved)
    {
        *credits.entry(registration.user_id.clone()).or_insert(0) += i64::from(event.participant_points);
        participants += 1;
    }

    Ok(PointsPlan {
        event_id: event.id,
        credits,
        participants,
    })
}

/// Points distribution service
#[derive(Clone)]
pub struct PointsService {
    store: Arc<dyn EventStore>,
    feed: EventFeed,
    redis: Option<Arc<RedisService>>,
}

impl PointsService {
    pub fn new(store: Arc<dyn EventStore>, feed: EventFeed, redis: Option<Arc<RedisService>>) -> Self {
        Self { store, feed, redis }
    }

    /// Approve the completion proof and pay out the event's awards
    pub async fn distribute(&self, event_id: EventId, admin_id: &str) -> Result<DistributionReceipt> {
        let receipt = match self.store.distribute_points(event_id).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(event_id = %event_id, admin_id = %admin_id, kind = e.kind(), "Points distribution refused: {}", e);
                return Err(e);
            }
        };

        info!(
            event_id = %event_id,
            participants = receipt.participants_credited,
            organizer_points = receipt.organizer_points,
            participant_points = receipt.participant_points,
            "Points distributed"
        );
        log_admin_action(
            admin_id,
            "distribute_points",
            Some(&event_id.to_string()),
            Some(&format!("{} participants credited", receipt.participants_credited)),
        );

        if let Some(redis) = &self.redis {
            if let Err(e) = redis.invalidate_leaderboard().await {
                warn!(event_id = %event_id, "Failed to invalidate leaderboard cache: {}", e);
            }
        }

        self.feed
            .publish(EventChange {
                event_id,
                kind: ChangeKind::Completed,
            })
            .await;

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use uuid::Uuid;
    use crate::models::City;

    fn reviewed_event() -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: "Mangrove clean-up".to_string(),
            organizer: "Organizer".to_string(),
            location: City::Makassar,
            location_detail: "Lantebung".to_string(),
            description: "Boots recommended".to_string(),
            image_url: None,
            date_time: now - Duration::days(1),
            capacity: 10,
            registered: 3,
            status: EventStatus::Approved,
            completion_status: CompletionStatus::ProofSubmitted,
            completion_proof_image_url: Some("https://img.example/proof.jpg".to_string()),
            points_distributed: false,
            organizer_points: 3,
            participant_points: 1,
            creator_id: "organizer".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn registration(event: &Event, user_id: &str, status: RegistrationStatus) -> Registration {
        Registration {
            event_id: event.id,
            user_id: user_id.to_string(),
            display_name: None,
            photo_url: None,
            status,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_approved_participants_are_credited() {
        let event = reviewed_event();
        let registrations = vec![
            registration(&event, "alice", RegistrationStatus::Approved),
            registration(&event, "bob", RegistrationStatus::Pending),
            registration(&event, "carol", RegistrationStatus::Approved),
            registration(&event, "dave", RegistrationStatus::Cancelled),
        ];

        let plan = plan_distribution(&event, &registrations).unwrap();
        assert_eq!(plan.participants, 2);
        assert_eq!(plan.credits.get("organizer"), Some(&3));
        assert_eq!(plan.credits.get("alice"), Some(&1));
        assert_eq!(plan.credits.get("carol"), Some(&1));
        assert!(!plan.credits.contains_key("bob"));
        assert_eq!(plan.total_points(), 5);
    }

    #[test]
    fn test_credits_are_ordered_by_user_id() {
        let event = reviewed_event();
        let registrations = vec![
            registration(&event, "zed", RegistrationStatus::Approved),
            registration(&event, "amy", RegistrationStatus::Approved),
        ];
        let plan = plan_distribution(&event, &registrations).unwrap();
        let order: Vec<_> = plan.credits.keys().cloned().collect();
        assert_eq!(order, vec!["amy", "organizer", "zed"]);
    }

    #[test]
    fn test_distributed_flag_refuses_second_batch() {
        let mut event = reviewed_event();
        event.points_distributed = true;
        assert_matches!(
            plan_distribution(&event, &[]),
            Err(GoLoopError::AlreadyDistributed { event_id }) if event_id == event.id
        );
    }

    #[test]
    fn test_requires_submitted_proof() {
        let mut event = reviewed_event();
        event.completion_status = CompletionStatus::AwaitingProof;
        assert_matches!(plan_distribution(&event, &[]), Err(GoLoopError::InvalidStateTransition { .. }));

        let mut event = reviewed_event();
        event.status = EventStatus::Rejected;
        assert_matches!(plan_distribution(&event, &[]), Err(GoLoopError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_event_with_no_participants_still_pays_organizer() {
        let event = reviewed_event();
        let plan = plan_distribution(&event, &[]).unwrap();
        assert_eq!(plan.participants, 0);
        assert_eq!(plan.credits.len(), 1);
        assert_eq!(plan.total_points(), 3);
    }
}
