//! rollplan - a transactional task-execution engine.
//!
//! Runs an ordered plan of file, command, AI and validation steps one at a
//! time, gating on dependencies, retrying recoverable failures and keeping a
//! rollback stack that can undo every file effect applied so far.

pub mod backend;
pub mod config;
pub mod core;
pub mod events;
pub mod execution;
pub mod testing;

pub use backend::{AiError, AiProvider, FileSystem, ProcessRunner};
pub use config::{ConfigError, ExecutorConfig, PlanConfig, YamlLoader};
pub use core::context::ExecutionContext;
pub use core::environment::Environment;
pub use core::result::{DEPENDENCIES_NOT_MET, TaskResult};
pub use core::retry::RetryPolicy;
pub use core::rollback::{RollbackAction, RollbackFailure, RollbackOperation, RollbackReport};
pub use core::task::{
    ChangeOp, LineChange, Task, TaskError, TaskKind, TaskMetadata, TaskStatus, ValidationType,
};
pub use core::types::TaskId;
pub use events::{Event, EventBus, EventHandler};
pub use execution::{CommandPolicy, TaskExecutor, TaskExecutorBuilder};
