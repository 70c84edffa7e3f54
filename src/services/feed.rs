//! Live change feed
//!
//! In-process fan-out of [`EventChange`]s. A [`Subscription`] must be taken
//! before the first snapshot read so nothing committed in between is missed;
//! dropping it releases the subscriber slot.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;
use crate::models::{EventChange, EventId};
use crate::services::redis::RedisService;

/// What a subscriber should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSignal {
    Changed(EventChange),
    /// Changes were dropped for this subscriber; re-read the snapshot
    Lagged(u64),
}

#[derive(Clone)]
pub struct EventFeed {
    sender: broadcast::Sender<EventChange>,
    relay: Option<Arc<RedisService>>,
    origin: Uuid,
}

impl EventFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            relay: None,
            origin: Uuid::new_v4(),
        }
    }

    /// Also publish every change to Redis for other instances
    pub fn with_relay(mut self, redis: Arc<RedisService>) -> Self {
        self.relay = Some(redis);
        self
    }

    /// Identifier of this instance on the relay channel
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Deliver locally, then hand the change to the relay in the background
    ///
    /// Callers publish after their write has committed, so the relay must
    /// never hold them up.
    pub async fn publish(&self, change: EventChange) {
        self.publish_local(change.clone());

        if let Some(relay) = &self.relay {
            let relay = relay.clone();
            let origin = self.origin;
            tokio::spawn(async move {
                if let Err(e) = relay.publish_change(origin, &change).await {
                    warn!(event_id = %change.event_id, error = %e, "Failed to relay change");
                }
            });
        }
    }

    /// Deliver to subscribers of this process only
    pub fn publish_local(&self, change: EventChange) {
        // An error only means nobody is subscribed right now
        if self.sender.send(change).is_err() {
            debug!("Change published with no subscribers");
        }
    }

    pub fn subscribe(&self, event_id: EventId) -> Subscription {
        debug!(event_id = %event_id, "Subscribing to event changes");
        Subscription {
            event_id,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Changes for one event
pub struct Subscription {
    event_id: EventId,
    receiver: broadcast::Receiver<EventChange>,
}

impl Subscription {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Wait for the next change to this event; `None` once the feed is gone
    pub async fn next(&mut self) -> Option<FeedSignal> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.event_id == self.event_id => return Some(FeedSignal::Changed(change)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(event_id = %self.event_id, skipped, "Subscriber lagged behind the feed");
                    return Some(FeedSignal::Lagged(skipped));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(event_id = %self.event_id, "Subscription released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeKind;

    fn change(event_id: EventId, kind: ChangeKind) -> EventChange {
        EventChange { event_id, kind }
    }

    #[tokio::test]
    async fn test_subscription_filters_other_events() {
        let feed = EventFeed::new(16);
        let watched = Uuid::new_v4();
        let mut subscription = feed.subscribe(watched);

        feed.publish(change(Uuid::new_v4(), ChangeKind::Moderated)).await;
        feed.publish(change(watched, ChangeKind::ProofSubmitted)).await;

        assert_eq!(
            subscription.next().await,
            Some(FeedSignal::Changed(change(watched, ChangeKind::ProofSubmitted)))
        );
    }

    #[tokio::test]
    async fn test_changes_after_subscribe_are_never_lost() {
        let feed = EventFeed::new(16);
        let event_id = Uuid::new_v4();
        let mut subscription = feed.subscribe(event_id);

        for user in ["a", "b", "c"] {
            feed.publish_local(change(event_id, ChangeKind::Registered { user_id: user.to_string() }));
        }

        for user in ["a", "b", "c"] {
            assert_eq!(
                subscription.next().await,
                Some(FeedSignal::Changed(change(event_id, ChangeKind::Registered { user_id: user.to_string() })))
            );
        }
    }

    #[tokio::test]
    async fn test_lag_is_reported() {
        let feed = EventFeed::new(2);
        let event_id = Uuid::new_v4();
        let mut subscription = feed.subscribe(event_id);

        for _ in 0..5 {
            feed.publish_local(change(event_id, ChangeKind::Moderated));
        }

        assert_eq!(subscription.next().await, Some(FeedSignal::Lagged(3)));
        assert_eq!(subscription.next().await, Some(FeedSignal::Changed(change(event_id, ChangeKind::Moderated))));
    }

    #[tokio::test]
    async fn test_drop_releases_subscriber() {
        let feed = EventFeed::new(4);
        let subscription = feed.subscribe(Uuid::new_v4());
        assert_eq!(feed.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let feed = EventFeed::new(4);
        let mut subscription = feed.subscribe(Uuid::new_v4());
        drop(feed);
        assert_eq!(subscription.next().await, None);
    }
}
