//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for executor settings and
//! plan files.

mod builder;
mod error;
mod types;
mod yaml;

pub use error::ConfigError;
pub use types::{DEFAULT_TEST_OUTPUT_LIMIT, ExecutorConfig, PlanConfig, TaskConfig};
pub use yaml::YamlLoader;
