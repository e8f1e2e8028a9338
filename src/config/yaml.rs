//! YAML configuration parsing.
//!
//! Parses executor settings and plan files, validating plans before they
//! reach the executor.

use std::collections::HashSet;
use std::path::Path;

use super::error::ConfigError;
use super::types::{ExecutorConfig, PlanConfig};

/// YAML configuration loader.
pub struct YamlLoader;

impl YamlLoader {
    /// Load executor settings from a file.
    pub fn load_executor_config(path: impl AsRef<Path>) -> Result<ExecutorConfig, ConfigError> {
        let path = path.as_ref();
        let content = read_file(path)?;
        let config: ExecutorConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate_executor_config(&config)?;
        Ok(config)
    }

    /// Parse executor settings from a YAML string.
    pub fn parse_executor_config(yaml: &str) -> Result<ExecutorConfig, ConfigError> {
        let config: ExecutorConfig = serde_yaml::from_str(yaml)?;
        Self::validate_executor_config(&config)?;
        Ok(config)
    }

    /// Load a plan from a file.
    ///
    /// A relative `working_directory` is resolved against the directory
    /// containing the plan file.
    pub fn load_plan_config(path: impl AsRef<Path>) -> Result<PlanConfig, ConfigError> {
        let path = path.as_ref();
        let content = read_file(path)?;
        let mut config: PlanConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate_plan_config(&config)?;

        if config.working_directory.is_relative() {
            if let Some(parent) = path.parent() {
                config.working_directory = parent.join(&config.working_directory);
            }
        }

        Ok(config)
    }

    /// Parse a plan from a YAML string.
    pub fn parse_plan_config(yaml: &str) -> Result<PlanConfig, ConfigError> {
        let config: PlanConfig = serde_yaml::from_str(yaml)?;
        Self::validate_plan_config(&config)?;
        Ok(config)
    }

    fn validate_executor_config(config: &ExecutorConfig) -> Result<(), ConfigError> {
        if config.allowed_commands.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "allowed_commands cannot be empty".into(),
            ));
        }

        // Entries are compared against base command names, so paths never match.
        for command in &config.allowed_commands {
            if command.is_empty() || command.contains(['/', '\\']) {
                return Err(ConfigError::InvalidConfig(format!(
                    "allowed command '{}' must be a bare program name",
                    command
                )));
            }
        }

        if config.command_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "command_timeout_secs cannot be zero".into(),
            ));
        }

        Ok(())
    }

    /// Validate a plan.
    ///
    /// Dependencies must name a task declared earlier in the list. Since
    /// tasks run in list order, a later task could never have a result yet,
    /// and this rule also rules out cycles.
    fn validate_plan_config(config: &PlanConfig) -> Result<(), ConfigError> {
        if config.name.trim().is_empty() {
            return Err(ConfigError::MissingField("name".into()));
        }

        if config.tasks.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "plan must have at least one task".into(),
            ));
        }

        let all_ids: HashSet<&str> = config
            .tasks
            .iter()
            .filter_map(|t| t.id.as_deref())
            .collect();

        let mut declared: HashSet<&str> = HashSet::new();
        for (index, task) in config.tasks.iter().enumerate() {
            let label = task
                .id
                .clone()
                .unwrap_or_else(|| format!("#{}", index + 1));

            if let Some(id) = task.id.as_deref() {
                if id.trim().is_empty() {
                    return Err(ConfigError::InvalidConfig(format!(
                        "task #{} has an empty id",
                        index + 1
                    )));
                }
                if declared.contains(id) {
                    return Err(ConfigError::InvalidConfig(format!("duplicate task id: {}", id)));
                }
            }

            let mut seen_deps = HashSet::new();
            for dep in &task.depends_on {
                if task.id.as_deref() == Some(dep.as_str()) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "task '{}' cannot depend on itself",
                        label
                    )));
                }
                if !seen_deps.insert(dep.as_str()) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "task '{}' has duplicate dependency '{}'",
                        label, dep
                    )));
                }
                if !declared.contains(dep.as_str()) {
                    let reason = if all_ids.contains(dep.as_str()) {
                        "which is declared later in the plan"
                    } else {
                        "which does not exist"
                    };
                    return Err(ConfigError::InvalidConfig(format!(
                        "task '{}' depends on '{}' {}",
                        label, dep, reason
                    )));
                }
            }

            if let Some(id) = task.id.as_deref() {
                declared.insert(id);
            }
        }

        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
        path: path.to_path_buf(),
        source,
    })
}
