//! Declared retry policies.
//!
//! A policy is a retry count and a fixed delay. It only re-attempts hard
//! errors; a procedure that ran and answered `false` is not retried.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Retry count plus fixed delay, as declared on a unit or task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first
    #[serde(default)]
    pub retries: u32,

    /// Delay between attempts in seconds
    #[serde(default)]
    pub delay_seconds: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            retries: 0,
            delay_seconds: 0,
        }
    }

    pub const fn fixed(retries: u32, delay_seconds: u64) -> Self {
        Self {
            retries,
            delay_seconds,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Check if we should retry after `attempt` (1-indexed) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }
}

/// Run `op`, re-attempting retryable errors per `policy`.
pub async fn with_retry<T, F, Fut>(label: &str, policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && policy.should_retry(attempt) => {
                warn!(
                    task = %label,
                    attempt,
                    delay_secs = policy.delay_seconds,
                    error = %e,
                    "Task failed, retrying"
                );
                tokio::time::sleep(policy.delay()).await;
            }
            Err(e) => return Err(e),
        }
    }
}
