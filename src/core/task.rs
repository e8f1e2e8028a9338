//! Task data model and error types.
//!
//! A [`Task`] is an immutable description of one planned step (its
//! [`TaskKind`] payload, dependencies and retry settings) plus the mutable
//! execution state the executor maintains: status, timestamps and result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::result::TaskResult;
use super::types::TaskId;
use crate::backend::AiError;

/// Errors that can occur while executing a single task.
///
/// These never escape the executor: each one is folded into a failed
/// [`TaskResult`] carrying the error's display string.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A file-create target is already present.
    #[error("File already exists: {}", .0.display())]
    FileExists(PathBuf),

    /// A filesystem operation failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The base command is not on the allow-list.
    #[error("command '{command}' is not allowed (allowed commands: {allowed})")]
    CommandNotAllowed { command: String, allowed: String },

    /// The arguments contain a shell metacharacter sequence.
    #[error("arguments contain forbidden sequence '{0}'")]
    UnsafeArgument(String),

    /// External command exited with a non-zero code.
    #[error("Command failed with code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },

    /// A validation tool reported problems.
    #[error("{kind} validation failed:\n{output}")]
    ValidationFailed { kind: ValidationType, output: String },

    /// A process could not be started or awaited.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A process ran past its configured timeout.
    #[error("process timed out after {0:?}")]
    Timeout(Duration),

    /// A file-modify change could not be applied.
    #[error("invalid change: {0}")]
    InvalidChange(String),

    /// The AI provider failed to answer.
    #[error("AI query failed: {0}")]
    Ai(#[from] AiError),

    /// The task is not in a state that allows execution.
    #[error("task '{id}' cannot be executed while {status}")]
    InvalidState { id: TaskId, status: TaskStatus },
}

impl TaskError {
    /// Build an I/O error annotated with the path involved.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is likely transient (a retry may succeed).
    pub fn is_transient(&self) -> bool {
        matches!(self, TaskError::Timeout(_) | TaskError::ExecutionFailed(_))
    }

    /// Check if this error was raised before any side effect took place.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TaskError::FileExists(_)
                | TaskError::CommandNotAllowed { .. }
                | TaskError::UnsafeArgument(_)
                | TaskError::InvalidChange(_)
                | TaskError::InvalidState { .. }
        )
    }
}

/// Execution status of a task.
///
/// Transitions run `Pending → InProgress → {Completed | Failed}`. A failed
/// task may re-enter `InProgress` for a retry; a completed task is final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Check whether moving to `next` is allowed.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Failed, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
        )
    }

    /// Whether the task has settled (completed or failed).
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Kind of validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationType {
    Syntax,
    Lint,
    Test,
    Build,
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationType::Syntax => "syntax",
            ValidationType::Lint => "lint",
            ValidationType::Test => "test",
            ValidationType::Build => "build",
        };
        f.write_str(s)
    }
}

/// Operation applied to a single line of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Insert before `line`, or append when no line is given.
    Insert,
    /// Remove the line at `line`.
    Delete,
    /// Overwrite the line at `line`.
    Replace,
}

/// One line-level edit of a file-modify task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    #[serde(rename = "type")]
    pub op: ChangeOp,
    /// 0-based line index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default)]
    pub content: String,
}

impl LineChange {
    pub fn insert(line: Option<usize>, content: impl Into<String>) -> Self {
        Self {
            op: ChangeOp::Insert,
            line,
            content: content.into(),
        }
    }

    pub fn delete(line: usize) -> Self {
        Self {
            op: ChangeOp::Delete,
            line: Some(line),
            content: String::new(),
        }
    }

    pub fn replace(line: usize, content: impl Into<String>) -> Self {
        Self {
            op: ChangeOp::Replace,
            line: Some(line),
            content: content.into(),
        }
    }
}

/// Step payload, one variant per task type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskKind {
    FileCreate {
        file_path: PathBuf,
        content: String,
    },
    FileModify {
        file_path: PathBuf,
        changes: Vec<LineChange>,
    },
    FileDelete {
        file_path: PathBuf,
    },
    CommandRun {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    AiQuery {
        query: String,
    },
    Validation {
        validation_type: ValidationType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

impl TaskKind {
    /// The task type tag, as it appears in plan files.
    pub fn type_name(&self) -> &'static str {
        match self {
            TaskKind::FileCreate { .. } => "file-create",
            TaskKind::FileModify { .. } => "file-modify",
            TaskKind::FileDelete { .. } => "file-delete",
            TaskKind::CommandRun { .. } => "command-run",
            TaskKind::AiQuery { .. } => "ai-query",
            TaskKind::Validation { .. } => "validation",
        }
    }

    /// Whether a successful run of this kind registers a rollback action.
    pub fn is_reversible(&self) -> bool {
        matches!(
            self,
            TaskKind::FileCreate { .. } | TaskKind::FileModify { .. } | TaskKind::FileDelete { .. }
        )
    }
}

/// Dependency and retry settings of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Ids of tasks that must have succeeded before this one runs.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    /// Retry failures instead of halting the batch.
    #[serde(default)]
    pub retryable: bool,
    /// Retry budget; `None` uses the executor's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

/// A single planned step and its execution state.
///
/// # Example
///
/// ```
/// use rollplan::{LineChange, Task};
///
/// let create = Task::file_create("create", "notes.txt", "hello");
/// let edit = Task::file_modify("edit", "notes.txt", vec![LineChange::replace(0, "world")])
///     .depends_on("create");
///
/// assert_eq!(edit.metadata.dependencies[0].as_str(), "create");
/// assert!(create.status().to_string() == "pending");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(default)]
    pub metadata: TaskMetadata,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<TaskResult>,
}

impl Task {
    /// Create a pending task.
    pub fn new(id: impl Into<TaskId>, description: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            kind,
            metadata: TaskMetadata::default(),
            status: TaskStatus::Pending,
            started_at: None,
            completed_at: None,
            result: None,
        }
    }

    pub fn file_create(
        id: impl Into<TaskId>,
        file_path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Self {
        let file_path = file_path.into();
        let description = format!("Create {}", file_path.display());
        Self::new(
            id,
            description,
            TaskKind::FileCreate {
                file_path,
                content: content.into(),
            },
        )
    }

    pub fn file_modify(
        id: impl Into<TaskId>,
        file_path: impl Into<PathBuf>,
        changes: Vec<LineChange>,
    ) -> Self {
        let file_path = file_path.into();
        let description = format!("Modify {}", file_path.display());
        Self::new(id, description, TaskKind::FileModify { file_path, changes })
    }

    pub fn file_delete(id: impl Into<TaskId>, file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let description = format!("Delete {}", file_path.display());
        Self::new(id, description, TaskKind::FileDelete { file_path })
    }

    pub fn command_run<I, S>(id: impl Into<TaskId>, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = command.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let description = format!("Run {} {}", command, args.join(" "))
            .trim_end()
            .to_string();
        Self::new(id, description, TaskKind::CommandRun { command, args })
    }

    pub fn ai_query(id: impl Into<TaskId>, query: impl Into<String>) -> Self {
        Self::new(
            id,
            "Query AI model",
            TaskKind::AiQuery {
                query: query.into(),
            },
        )
    }

    pub fn validation(
        id: impl Into<TaskId>,
        validation_type: ValidationType,
        target: Option<String>,
    ) -> Self {
        Self::new(
            id,
            format!("Run {validation_type} validation"),
            TaskKind::Validation {
                validation_type,
                target,
            },
        )
    }

    /// Builder: replace the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: add a dependency. Duplicates are ignored, order is kept.
    pub fn depends_on(mut self, id: impl Into<TaskId>) -> Self {
        let id = id.into();
        if !self.metadata.dependencies.contains(&id) {
            self.metadata.dependencies.push(id);
        }
        self
    }

    /// Builder: mark the task retryable with an explicit retry budget.
    pub fn retryable(mut self, max_retries: u32) -> Self {
        self.metadata.retryable = true;
        self.metadata.max_retries = Some(max_retries);
        self
    }

    /// Builder: mark the task retryable using the executor's default budget.
    pub fn retryable_default(mut self) -> Self {
        self.metadata.retryable = true;
        self.metadata.max_retries = None;
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn result(&self) -> Option<&TaskResult> {
        self.result.as_ref()
    }

    /// Enter `InProgress`, clearing the outcome of any earlier attempt.
    pub(crate) fn begin(&mut self) -> Result<(), TaskError> {
        if !self.status.can_transition_to(TaskStatus::InProgress) {
            return Err(TaskError::InvalidState {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.status = TaskStatus::InProgress;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        self.result = None;
        Ok(())
    }

    /// Settle the task with its result; status follows `result.success`.
    pub(crate) fn finish(&mut self, result: TaskResult) {
        self.status = if result.success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        self.completed_at = Some(result.timestamp);
        self.result = Some(result);
    }
}
