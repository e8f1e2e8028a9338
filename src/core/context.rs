//! Run-scoped execution settings shared by every task in a batch.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::environment::Environment;

/// Per-run configuration supplied by the caller.
///
/// - `working_directory`: cwd for spawned processes and the base for
///   relative file paths
/// - `environment`: variables added to spawned processes
/// - `dry_run`: report intended actions without performing any of them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub working_directory: PathBuf,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub dry_run: bool,
}

impl ExecutionContext {
    /// Create a context rooted at `working_directory`.
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            environment: Environment::default(),
            dry_run: false,
        }
    }

    /// Builder: set the environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Builder: add a single environment variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.set(key, value);
        self
    }

    /// Builder: toggle dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve a task path against the working directory.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }
}
