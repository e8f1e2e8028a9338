//! Task execution engine.
//!
//! This module provides the executor that runs plans, together with the
//! pieces its handlers are built from: command screening, line edits and the
//! validation command table.

mod changes;
mod executor;
mod policy;
mod validation;

pub use changes::apply_line_changes;
pub use executor::{TaskExecutor, TaskExecutorBuilder};
pub use policy::{
    CommandPolicy, DEFAULT_ALLOWED_COMMANDS, FORBIDDEN_SEQUENCES, base_command, check_arguments,
};
pub use validation::{OutputChannel, ValidationCommand};
