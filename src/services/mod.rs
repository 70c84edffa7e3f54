//! Services module
//!
//! This module contains business logic services

pub mod events;
pub mod feed;
pub mod identity;
pub mod image_host;
pub mod points;
pub mod redis;
pub mod registration;
pub mod users;

// Re-export commonly used services
pub use events::{AdminBucket, EventService, ModerationDecision, MyEvents};
pub use feed::{EventFeed, FeedSignal, Subscription};
pub use identity::{Identity, IdentityVerifier};
pub use image_host::{ImageHostClient, ImageUpload};
pub use points::{DistributionReceipt, PointsService};
pub use redis::RedisService;
pub use registration::RegistrationService;
pub use users::UserService;

use std::sync::Arc;
use serde::Serialize;
use tracing::warn;
use crate::config::Settings;
use crate::database::EventStore;
use crate::middleware::rate_limit::RegistrationLimiter;
use crate::utils::errors::Result;

/// Buffered changes per subscriber before it is told to re-read
pub const FEED_CAPACITY: usize = 256;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub registration: RegistrationService,
    pub points: PointsService,
    pub events: EventService,
    pub users: UserService,
    pub feed: EventFeed,
    pub limiter: Arc<RegistrationLimiter>,
    store: Arc<dyn EventStore>,
    redis: Option<Arc<RedisService>>,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    ///
    /// `redis` is optional; without it the leaderboard is read straight from
    /// the store and changes stay within this process.
    pub fn new(settings: &Settings, store: Arc<dyn EventStore>, redis: Option<Arc<RedisService>>) -> Result<Self> {
        let mut feed = EventFeed::new(FEED_CAPACITY);
        if settings.features.live_updates {
            if let Some(redis) = &redis {
                feed = feed.with_relay(redis.clone());
            }
        }

        let image_host = if settings.features.proof_uploads {
            Some(ImageHostClient::new(settings.image_host.clone())?)
        } else {
            None
        };

        let limiter = Arc::new(RegistrationLimiter::new(&settings.rate_limit));
        let verifier = IdentityVerifier::new(&settings.identity);

        Ok(Self {
            registration: RegistrationService::new(store.clone(), feed.clone(), limiter.clone()),
            points: PointsService::new(store.clone(), feed.clone(), redis.clone()),
            events: EventService::new(store.clone(), feed.clone(), image_host, settings.points.clone()),
            users: UserService::new(store.clone(), verifier, redis.clone()),
            feed,
            limiter,
            store,
            redis,
        })
    }

    /// Health check for the store and the cache
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let store_healthy = match self.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Store health check failed");
                false
            }
        };

        let redis_healthy = match &self.redis {
            Some(redis) => Some(redis.health_check().await.unwrap_or(false)),
            None => None,
        };

        ServiceHealthStatus {
            store_healthy,
            redis_healthy,
            live_subscribers: self.feed.subscriber_count(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealthStatus {
    pub store_healthy: bool,
    /// `None` when no Redis is configured
    pub redis_healthy: Option<bool>,
    pub live_subscribers: usize,
}

impl ServiceHealthStatus {
    /// The store is critical; Redis only degrades caching and fan-out
    pub fn is_healthy(&self) -> bool {
        self.store_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.store_healthy {
            issues.push("Store unavailable".to_string());
        }
        if self.redis_healthy == Some(false) {
            issues.push("Redis connection failed".to_string());
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_issues() {
        let status = ServiceHealthStatus {
            store_healthy: true,
            redis_healthy: Some(false),
            live_subscribers: 0,
        };
        assert!(status.is_healthy());
        assert_eq!(status.get_issues(), vec!["Redis connection failed".to_string()]);

        let status = ServiceHealthStatus {
            store_healthy: false,
            redis_healthy: None,
            live_subscribers: 0,
        };
        assert!(!status.is_healthy());
        assert_eq!(status.get_issues().len(), 1);
    }
}
