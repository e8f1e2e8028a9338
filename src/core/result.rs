//! Outcome record produced by executing a task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Error message carried by results synthesized for tasks whose
/// dependencies have not succeeded.
pub const DEPENDENCIES_NOT_MET: &str = "Dependencies not met";

/// Result of executing a task.
///
/// `output` is present exactly when `success` is true and `error` exactly
/// when it is false. The constructors are the only way the executor builds
/// results, which keeps that pairing intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the task succeeded.
    pub success: bool,
    /// Human-readable summary of what the task did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error message if the task failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the attempt.
    #[serde(with = "serde_millis")]
    pub duration: Duration,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
}

impl TaskResult {
    /// Create a successful result.
    pub fn success(output: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            duration,
            timestamp: Utc::now(),
        }
    }

    /// Create a failed result.
    pub fn failure(error: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            duration,
            timestamp: Utc::now(),
        }
    }

    /// Result for a task that was skipped because a dependency has no
    /// successful result. No attempt was made, so the duration is zero.
    pub fn dependencies_not_met() -> Self {
        Self::failure(DEPENDENCIES_NOT_MET, Duration::ZERO)
    }

    /// Whether this result was synthesized by the dependency gate.
    pub fn is_skipped(&self) -> bool {
        !self.success && self.duration.is_zero() && self.error.as_deref() == Some(DEPENDENCIES_NOT_MET)
    }

    /// Duration in whole milliseconds.
    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }
}

/// Serde helper serializing a `Duration` as integer milliseconds.
pub(crate) mod serde_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
