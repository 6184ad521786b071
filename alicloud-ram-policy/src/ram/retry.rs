//! Exponential backoff around RAM API calls.
//!
//! Every call is repeated while it fails with a transient error code and the total time spent
//! stays under `max_elapsed_ms`. Permanent errors are returned on the first occurrence.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{RamPolicyError, RamPolicyResult};
use crate::ram::ApiResult;

/// Backoff parameters for one class of RAM API calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first retry (milliseconds).
    pub initial_interval_ms: u64,
    /// Growth factor applied to the delay after each retry.
    pub multiplier: f64,
    /// Upper bound for a single delay (milliseconds).
    pub max_interval_ms: u64,
    /// Wall-clock ceiling across all attempts (milliseconds).
    pub max_elapsed_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            multiplier: 1.5,
            max_interval_ms: 60_000,
            max_elapsed_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Longer ceiling used for detach/delete, where giving up leaves orphaned policies behind.
    pub fn teardown() -> Self {
        Self::default().with_max_elapsed_ms(60_000)
    }

    #[must_use]
    pub const fn with_initial_interval_ms(mut self, ms: u64) -> Self {
        self.initial_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub const fn with_max_interval_ms(mut self, ms: u64) -> Self {
        self.max_interval_ms = ms;
        self
    }

    #[must_use]
    pub const fn with_max_elapsed_ms(mut self, ms: u64) -> Self {
        self.max_elapsed_ms = ms;
        self
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn interval_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let ms = (self.initial_interval_ms as f64 * factor).min(self.max_interval_ms as f64);
        Duration::from_millis(ms as u64)
    }

    /// Run `call` until it succeeds, fails permanently, or the elapsed ceiling is reached.
    ///
    /// `operation` names the call in logs and errors.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> RamPolicyResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let started = Instant::now();
        let ceiling = Duration::from_millis(self.max_elapsed_ms);
        let mut attempt: u32 = 0;

        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(RamPolicyError::PermanentApi {
                    operation: operation.to_string(),
                    source: err,
                });
            }

            let delay = self.interval_for(attempt);
            attempt += 1;
            if started.elapsed() + delay > ceiling {
                warn!(
                    "{} still failing after {} attempts, giving up: {}",
                    operation, attempt, err
                );
                return Err(RamPolicyError::TransientApi {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: err,
                });
            }

            debug!(
                "{} failed with transient error ({}), retrying in {:?}",
                operation, err.code, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
