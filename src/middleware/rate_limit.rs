//! Rate limiting
//!
//! Registration attempts are limited per user so a client hammering the
//! register endpoint cannot monopolise the event row lock.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use crate::config::RateLimitConfig;
use crate::utils::errors::{GoLoopError, Result};

/// Keyed limiter for registration attempts
pub struct RegistrationLimiter {
    limiter: Option<DefaultKeyedRateLimiter<String>>,
}

impl RegistrationLimiter {
    /// A zero rate disables limiting
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = NonZeroU32::new(config.registrations_per_minute).map(|rate| {
            let burst = NonZeroU32::new(config.burst).unwrap_or(rate);
            RateLimiter::keyed(Quota::per_minute(rate).allow_burst(burst))
        });

        if limiter.is_none() {
            debug!("Registration rate limiting disabled");
        }

        Self { limiter }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    /// Consume one attempt for `user_id`
    pub fn check(&self, user_id: &str) -> Result<()> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        match limiter.check_key(&user_id.to_string()) {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(user_id = %user_id, "Registration rate limit exceeded");
                Err(GoLoopError::RateLimitExceeded)
            }
        }
    }

    /// Forget users whose quota has fully replenished
    pub fn cleanup(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    pub fn tracked_users(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }

    /// Run [`cleanup`](Self::cleanup) every `period` until the task is aborted
    pub fn spawn_cleanup(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let before = self.tracked_users();
                self.cleanup();
                debug!(before, after = self.tracked_users(), "Registration limiter cleaned up");
            }
        })
    }
}

impl std::fmt::Debug for RegistrationLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationLimiter")
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio_test::{assert_err, assert_ok};

    fn config(per_minute: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            registrations_per_minute: per_minute,
            burst,
        }
    }

    #[test]
    fn test_burst_then_refusal() {
        let limiter = RegistrationLimiter::new(&config(1, 3));
        for _ in 0..3 {
            assert_ok!(limiter.check("user-1"));
        }
        assert_matches!(limiter.check("user-1"), Err(GoLoopError::RateLimitExceeded));
    }

    #[test]
    fn test_users_are_limited_independently() {
        let limiter = RegistrationLimiter::new(&config(1, 1));
        assert_ok!(limiter.check("user-1"));
        assert_err!(limiter.check("user-1"));
        assert_ok!(limiter.check("user-2"));
        assert_eq!(limiter.tracked_users(), 2);
    }

    #[test]
    fn test_cleanup_forgets_replenished_users() {
        let limiter = RegistrationLimiter::new(&config(60_000, 1));
        assert_ok!(limiter.check("user-1"));
        assert_eq!(limiter.tracked_users(), 1);

        std::thread::sleep(Duration::from_millis(20));
        limiter.cleanup();
        assert_eq!(limiter.tracked_users(), 0);
    }

    #[test]
    fn test_cleanup_keeps_users_still_limited() {
        let limiter = RegistrationLimiter::new(&config(1, 1));
        assert_ok!(limiter.check("user-1"));
        limiter.cleanup();
        assert_eq!(limiter.tracked_users(), 1);
    }

    #[tokio::test]
    async fn test_periodic_cleanup_task() {
        let limiter = Arc::new(RegistrationLimiter::new(&config(60_000, 1)));
        let task = limiter.clone().spawn_cleanup(Duration::from_millis(10));
        assert_ok!(limiter.check("user-1"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(limiter.tracked_users(), 0);
        task.abort();
    }

    #[test]
    fn test_zero_rate_disables_limiting() {
        let limiter = RegistrationLimiter::new(&config(0, 0));
        for _ in 0..100 {
            assert!(limiter.check("user-1").is_ok());
        }
        assert_eq!(limiter.tracked_users(), 0);
    }
}
