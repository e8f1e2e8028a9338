//! Conversion from plan configuration into executable tasks.

use crate::core::context::ExecutionContext;
use crate::core::task::{Task, TaskKind, TaskMetadata};
use crate::core::types::TaskId;

use super::types::{PlanConfig, TaskConfig};

impl PlanConfig {
    /// Run context described by the plan.
    pub fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::new(self.working_directory.clone())
            .with_environment(self.environment.clone())
            .with_dry_run(self.dry_run)
    }

    /// Build the pending tasks, in plan order.
    ///
    /// Entries without an id get a fresh UUID.
    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks.into_iter().map(TaskConfig::into_task).collect()
    }
}

impl TaskConfig {
    /// Build a pending task from this entry.
    pub fn into_task(self) -> Task {
        let id = self.id.map(TaskId::new).unwrap_or_else(TaskId::generate);
        let description = self
            .description
            .unwrap_or_else(|| default_description(&self.kind));

        let mut task = Task::new(id, description, self.kind);
        task.metadata = TaskMetadata {
            dependencies: self.depends_on.into_iter().map(TaskId::new).collect(),
            retryable: self.retryable,
            max_retries: self.max_retries,
        };
        task
    }
}

fn default_description(kind: &TaskKind) -> String {
    match kind {
        TaskKind::FileCreate { file_path, .. } => format!("Create {}", file_path.display()),
        TaskKind::FileModify { file_path, .. } => format!("Modify {}", file_path.display()),
        TaskKind::FileDelete { file_path } => format!("Delete {}", file_path.display()),
        TaskKind::CommandRun { command, args } => {
            format!("Run {} {}", command, args.join(" ")).trim_end().to_string()
        }
        TaskKind::AiQuery { .. } => "Query AI model".to_string(),
        TaskKind::Validation {
            validation_type, ..
        } => format!("Run {validation_type} validation"),
    }
}
