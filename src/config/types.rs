//! Configuration type definitions.
//!
//! Two YAML documents are understood: the executor settings file
//! ([`ExecutorConfig`]) and a plan file ([`PlanConfig`]) holding an ordered
//! task list.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::environment::Environment;
use crate::core::retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY};
use crate::core::task::TaskKind;
use crate::execution::{CommandPolicy, DEFAULT_ALLOWED_COMMANDS};

/// Default number of test-runner stdout characters kept in a passing result.
pub const DEFAULT_TEST_OUTPUT_LIMIT: usize = 500;

/// Executor settings (rollplan.yaml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Base command names command-run tasks may invoke.
    pub allowed_commands: Vec<String>,
    /// Base delay for linear retry backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Retry budget for retryable tasks that do not set `max_retries`.
    pub default_max_retries: u32,
    /// Kill command-run and validation processes after this many seconds.
    pub command_timeout_secs: Option<u64>,
    /// Characters of test-runner stdout echoed by a passing test validation.
    pub test_output_limit: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            allowed_commands: DEFAULT_ALLOWED_COMMANDS.iter().map(|s| s.to_string()).collect(),
            retry_base_delay_ms: u64::try_from(DEFAULT_RETRY_BASE_DELAY.as_millis())
                .unwrap_or(1000),
            default_max_retries: DEFAULT_MAX_RETRIES,
            command_timeout_secs: None,
            test_output_limit: DEFAULT_TEST_OUTPUT_LIMIT,
        }
    }
}

impl ExecutorConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Command policy built from `allowed_commands`.
    pub fn command_policy(&self) -> CommandPolicy {
        CommandPolicy::new(self.allowed_commands.iter().cloned())
    }
}

/// A plan file: run settings plus an ordered task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Plan name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Working directory for the run. Relative values are resolved against
    /// the plan file's directory when loaded from disk.
    #[serde(default = "default_working_directory")]
    pub working_directory: PathBuf,
    /// Variables added to every spawned process.
    #[serde(default)]
    pub environment: Environment,
    /// Report intended actions without performing them.
    #[serde(default)]
    pub dry_run: bool,
    /// Tasks, executed in this order.
    pub tasks: Vec<TaskConfig>,
}

fn default_working_directory() -> PathBuf {
    PathBuf::from(".")
}

/// One task entry of a plan file.
///
/// ```yaml
/// - id: install
///   type: command-run
///   command: npm
///   args: [install]
///   retryable: true
///   max_retries: 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Task identifier; a UUID is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-readable description; derived from the payload when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Task type tag and payload.
    #[serde(flatten)]
    pub kind: TaskKind,
    /// Ids of earlier tasks that must succeed first.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Retry on failure instead of halting the plan.
    #[serde(default)]
    pub retryable: bool,
    /// Retry budget; the executor default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}
