//! Transaction retry policy
//!
//! PostgreSQL aborts a transaction with SQLSTATE 40001 (serialization failure)
//! or 40P01 (deadlock detected) when it loses a conflict. Such a transaction
//! wrote nothing, so the whole closure is re-run with a fresh transaction.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use crate::utils::errors::{is_transient_sqlx, GoLoopError, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            ..Self::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay.saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
        }
    }
}

fn is_conflict(error: &GoLoopError) -> bool {
    matches!(error, GoLoopError::Database(e) if is_transient_sqlx(e))
}

/// Run `operation` until it succeeds, fails with a non-conflict error, or
/// the policy's attempts are exhausted
pub async fn with_retries<T, F, Fut>(policy: RetryPolicy, operation_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "Transaction committed after retry");
                }
                return Ok(value);
            }
            Err(e) if is_conflict(&e) && attempt + 1 < policy.attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transaction conflict, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
