//! Rollback bookkeeping.
//!
//! Every successful side-effecting step records a [`RollbackAction`]: the
//! task id, a description, and an inspectable [`RollbackOperation`] that
//! undoes the effect. Actions live on a [`RollbackStack`] and are undone in
//! strict LIFO order, because later steps may depend on earlier ones (a file
//! created by one step and modified by the next).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::types::TaskId;

/// Undo operation for a durable effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum RollbackOperation {
    /// Remove a file the step created.
    DeleteFile { path: PathBuf },
    /// Write back the full content a file had before the step.
    RestoreFile { path: PathBuf, content: String },
}

impl RollbackOperation {
    pub fn path(&self) -> &PathBuf {
        match self {
            RollbackOperation::DeleteFile { path } => path,
            RollbackOperation::RestoreFile { path, .. } => path,
        }
    }

    fn describe(&self) -> String {
        match self {
            RollbackOperation::DeleteFile { path } => format!("Delete file: {}", path.display()),
            RollbackOperation::RestoreFile { path, .. } => {
                format!("Restore file: {}", path.display())
            }
        }
    }
}

/// A recorded undo step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackAction {
    pub task_id: TaskId,
    pub description: String,
    pub operation: RollbackOperation,
}

impl RollbackAction {
    /// Create an action whose description is derived from the operation.
    pub fn new(task_id: TaskId, operation: RollbackOperation) -> Self {
        Self {
            task_id,
            description: operation.describe(),
            operation,
        }
    }

    pub fn delete_file(task_id: TaskId, path: impl Into<PathBuf>) -> Self {
        Self::new(task_id, RollbackOperation::DeleteFile { path: path.into() })
    }

    pub fn restore_file(task_id: TaskId, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self::new(
            task_id,
            RollbackOperation::RestoreFile {
                path: path.into(),
                content: content.into(),
            },
        )
    }
}

/// LIFO stack of pending rollback actions, kept in apply order.
#[derive(Debug, Clone, Default)]
pub struct RollbackStack {
    actions: Vec<RollbackAction>,
}

impl RollbackStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: RollbackAction) {
        self.actions.push(action);
    }

    /// Take the most recently applied action.
    pub fn pop(&mut self) -> Option<RollbackAction> {
        self.actions.pop()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Pending actions in apply order (oldest first).
    pub fn actions(&self) -> &[RollbackAction] {
        &self.actions
    }
}

/// An undo that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackFailure {
    pub action: RollbackAction,
    pub error: String,
}

/// Outcome of unwinding the rollback stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Actions undone successfully, in the order they ran.
    pub undone: Vec<RollbackAction>,
    /// Actions whose undo failed; unwinding continued past each of them.
    pub failed: Vec<RollbackFailure>,
}

impl RollbackReport {
    /// True when every undo succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of actions attempted.
    pub fn attempted(&self) -> usize {
        self.undone.len() + self.failed.len()
    }
}
