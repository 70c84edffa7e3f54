//! Redis integration service implementation
//!
//! This service handles short-lived caching (the leaderboard) and the pub/sub
//! relay that carries event changes between API instances. Every command is
//! bounded by `redis.command_timeout_ms` so a stalled server degrades the
//! cache instead of holding requests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{Client, AsyncCommands, RedisResult};
use serde::{Serialize, Deserialize};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{info, warn, debug};
use uuid::Uuid;
use crate::config::RedisConfig;
use crate::models::{EventChange, User};
use crate::services::feed::EventFeed;
use crate::utils::errors::{GoLoopError, Result};

const LEADERBOARD_KEY: &str = "leaderboard";
const CHANGES_CHANNEL: &str = "event_changes";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Redis service for caching and change fan-out
#[derive(Clone)]
pub struct RedisService {
    client: Client,
    /// Shared multiplexed connection, opened on first use
    manager: Arc<OnceCell<ConnectionManager>>,
    config: RedisConfig,
}

/// Change as published on the relay channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedChange {
    /// Instance that published the change
    pub origin: Uuid,
    pub change: EventChange,
}

impl RedisService {
    /// Create a new RedisService instance; no connection is opened yet
    pub fn new(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        Ok(Self {
            client,
            manager: Arc::new(OnceCell::new()),
            config,
        })
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.config.command_timeout_ms)
    }

    /// Run `operation` against the shared connection within the command timeout
    async fn bounded<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempt = async {
            let manager = self
                .manager
                .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
                .await?
                .clone();
            operation(manager).await
        };

        match tokio::time::timeout(self.command_timeout(), attempt).await {
            Ok(result) => result,
            Err(_) => Err(GoLoopError::ServiceUnavailable(format!(
                "Redis did not answer within {}ms",
                self.config.command_timeout_ms
            ))),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    fn channel(&self) -> String {
        self.full_key(CHANGES_CHANNEL)
    }

    /// Set a value in Redis with TTL
    pub async fn set<T>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()>
    where
        T: Serialize,
    {
        let serialized = serde_json::to_string(value)?;
        let full_key = self.full_key(key);
        let ttl = ttl_seconds.unwrap_or(self.config.ttl_seconds);

        self.bounded(|mut conn| async move {
            conn.set_ex::<_, _, ()>(&full_key, serialized, ttl)
                .await
                .map_err(GoLoopError::from)
        })
        .await?;

        debug!(key = %self.full_key(key), ttl = ttl, "Value set in Redis");
        Ok(())
    }

    /// Get a value from Redis
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let full_key = self.full_key(key);
        let lookup = full_key.clone();

        let result: Option<String> = self
            .bounded(|mut conn| async move {
                conn.get::<_, Option<String>>(&lookup).await.map_err(GoLoopError::from)
            })
            .await?;

        match result {
            Some(data) => {
                debug!(key = %full_key, "Value retrieved from Redis");
                Ok(Some(serde_json::from_str::<T>(&data)?))
            }
            None => {
                debug!(key = %full_key, "Key not found in Redis");
                Ok(None)
            }
        }
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let full_key = self.full_key(key);
        let target = full_key.clone();

        let deleted: i32 = self
            .bounded(|mut conn| async move { conn.del::<_, i32>(&target).await.map_err(GoLoopError::from) })
            .await?;

        debug!(key = %full_key, deleted = deleted > 0, "Key deletion attempted");
        Ok(deleted > 0)
    }

    pub async fn cache_leaderboard(&self, users: &[User]) -> Result<()> {
        self.set(LEADERBOARD_KEY, &users, None).await
    }

    pub async fn get_leaderboard(&self) -> Result<Option<Vec<User>>> {
        self.get(LEADERBOARD_KEY).await
    }

    pub async fn invalidate_leaderboard(&self) -> Result<bool> {
        self.delete(LEADERBOARD_KEY).await
    }

    /// Publish a change for the other instances
    pub async fn publish_change(&self, origin: Uuid, change: &EventChange) -> Result<()> {
        let payload = serde_json::to_string(&RelayedChange {
            origin,
            change: change.clone(),
        })?;
        let channel = self.channel();

        let receivers: i64 = self
            .bounded(|mut conn| async move {
                conn.publish::<_, _, i64>(channel, payload).await.map_err(GoLoopError::from)
            })
            .await?;
        debug!(event_id = %change.event_id, receivers, "Change relayed");
        Ok(())
    }

    /// Feed changes published by other instances into the local feed
    ///
    /// Reconnects after a delay whenever the subscription drops.
    pub fn forward_changes(self: Arc<Self>, feed: EventFeed) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.relay_into(&feed).await {
                    Ok(()) => warn!("Change relay subscription ended, reconnecting"),
                    Err(e) => warn!(error = %e, "Change relay failed, reconnecting"),
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        })
    }

    async fn relay_into(&self, feed: &EventFeed) -> Result<()> {
        let connect = async {
            let mut pubsub = self.client.get_async_connection().await?.into_pubsub();
            pubsub.subscribe(self.channel()).await?;
            Ok::<_, GoLoopError>(pubsub)
        };
        let mut pubsub = match tokio::time::timeout(self.command_timeout(), connect).await {
            Ok(pubsub) => pubsub?,
            Err(_) => {
                return Err(GoLoopError::ServiceUnavailable(
                    "Redis did not accept the relay subscription in time".to_string(),
                ))
            }
        };
        info!(channel = %self.channel(), "Subscribed to change relay");

        let mut messages = pubsub.on_message();
        while let Some(message) = messages.next().await {
            let payload: String = match message.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Unreadable relay payload");
                    continue;
                }
            };

            match serde_json::from_str::<RelayedChange>(&payload) {
                Ok(relayed) if relayed.origin == feed.origin() => {}
                Ok(relayed) => feed.publish_local(relayed.change),
                Err(e) => warn!(error = %e, "Malformed relay payload"),
            }
        }

        Ok(())
    }

    /// Health check for Redis connection
    pub async fn health_check(&self) -> Result<bool> {
        let ping = self
            .bounded(|mut conn| async move {
                let response: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
                Ok::<_, GoLoopError>(response)
            })
            .await;

        match ping {
            Ok(Ok(response)) => {
                debug!(response = %response, "Redis health check successful");
                Ok(response == "PONG")
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Redis health check failed");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Redis connection failed");
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for RedisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisService")
            .field("prefix", &self.config.prefix)
            .field("connected", &self.manager.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::ChangeKind;

    #[test]
    fn test_keys_carry_prefix() {
        let service = RedisService::new(Settings::default().redis).unwrap();
        assert_eq!(service.full_key("leaderboard"), "goloop:leaderboard");
        assert_eq!(service.channel(), "goloop:event_changes");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let mut config = Settings::default().redis;
        config.url = "not-a-redis-url".to_string();
        assert!(RedisService::new(config).is_err());
    }

    #[test]
    fn test_relayed_change_serialization() {
        let relayed = RelayedChange {
            origin: Uuid::new_v4(),
            change: EventChange {
                event_id: Uuid::new_v4(),
                kind: ChangeKind::Registered { user_id: "u1".to_string() },
            },
        };

        let serialized = serde_json::to_string(&relayed).unwrap();
        assert!(serialized.contains("\"type\":\"registered\""));
        let deserialized: RelayedChange = serde_json::from_str(&serialized).unwrap();
        assert_eq!(relayed, deserialized);
    }
}
