//! Retry policy for retryable tasks.
//!
//! Retries use linear backoff: the delay before retry `n` (1-indexed) is
//! `base_delay × n`, so with the default one-second base the waits are
//! 1s, 2s, 3s, ...

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::result::serde_millis;
use super::task::TaskMetadata;

/// Default number of retries when a retryable task leaves `max_retries` unset.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for linear backoff.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retry policy for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries, not including the initial attempt.
    /// `max_retries = 3` means up to 4 attempts in total.
    pub max_retries: u32,

    /// Base delay multiplied by the retry number.
    #[serde(with = "serde_millis")]
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Create a policy with linear backoff.
    ///
    /// # Arguments
    /// * `max_retries` - Maximum retries (not including initial try)
    /// * `base_delay` - Delay before the first retry; later retries wait a multiple of it
    pub fn linear(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Derive the policy for a task from its metadata.
    ///
    /// Non-retryable tasks get [`RetryPolicy::none`]. Retryable tasks use their
    /// own `max_retries` or fall back to `default_max_retries`.
    pub fn for_task(metadata: &TaskMetadata, default_max_retries: u32, base_delay: Duration) -> Self {
        if !metadata.retryable {
            return Self::none();
        }
        Self::linear(
            metadata.max_retries.unwrap_or(default_max_retries),
            base_delay,
        )
    }

    /// Check if retries are enabled.
    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Check if another retry is allowed.
    ///
    /// # Arguments
    /// * `retries` - Number of retries already made (the initial attempt is not counted)
    pub fn should_retry(&self, retries: u32) -> bool {
        retries < self.max_retries
    }

    /// Delay to wait before the given retry (1-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }
}

impl Default for RetryPolicy {
    /// Default policy: no retries.
    fn default() -> Self {
        Self::none()
    }
}
