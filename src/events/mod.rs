//! Lifecycle events and event handling.
//!
//! The executor reports plan, task and rollback progress as [`Event`]s on an
//! optional [`EventBus`]. Delivery is awaited inline, so handlers observe
//! events in exactly the order the executor produced them.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::TaskId;

/// Lifecycle events emitted during execution.
#[derive(Debug, Clone)]
pub enum Event {
    /// A batch started.
    PlanStarted {
        task_count: usize,
        dry_run: bool,
        timestamp: Instant,
    },

    /// A task entered `in-progress`.
    TaskStarted { task_id: TaskId, timestamp: Instant },

    /// A task attempt succeeded.
    TaskCompleted {
        task_id: TaskId,
        duration: Duration,
        output: String,
        timestamp: Instant,
    },

    /// A task attempt failed.
    TaskFailed {
        task_id: TaskId,
        duration: Duration,
        error: String,
        timestamp: Instant,
    },

    /// A failed retryable task is about to be retried.
    ///
    /// Emitted before the backoff delay. `retry` is 1-indexed and counts
    /// retries only, so `retry = 1` follows the initial attempt.
    TaskRetrying {
        task_id: TaskId,
        retry: u32,
        max_retries: u32,
        delay: Duration,
        timestamp: Instant,
    },

    /// A task was skipped because some dependencies have no successful result.
    TaskSkipped {
        task_id: TaskId,
        missing: Vec<TaskId>,
        timestamp: Instant,
    },

    /// A non-retryable failure stopped the batch.
    PlanHalted {
        task_id: TaskId,
        error: String,
        timestamp: Instant,
    },

    /// A batch finished. `attempted` may be smaller than the input when halted.
    PlanCompleted {
        attempted: usize,
        succeeded: usize,
        halted: bool,
        duration: Duration,
        timestamp: Instant,
    },

    /// Rollback of the pending stack started.
    RollbackStarted {
        action_count: usize,
        timestamp: Instant,
    },

    /// One action was undone.
    ActionRolledBack {
        task_id: TaskId,
        description: String,
        timestamp: Instant,
    },

    /// One undo failed; unwinding continues.
    RollbackFailed {
        task_id: TaskId,
        description: String,
        error: String,
        timestamp: Instant,
    },

    /// The rollback stack is empty again.
    RollbackCompleted {
        undone: usize,
        failed: usize,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::PlanStarted { timestamp, .. }
            | Event::TaskStarted { timestamp, .. }
            | Event::TaskCompleted { timestamp, .. }
            | Event::TaskFailed { timestamp, .. }
            | Event::TaskRetrying { timestamp, .. }
            | Event::TaskSkipped { timestamp, .. }
            | Event::PlanHalted { timestamp, .. }
            | Event::PlanCompleted { timestamp, .. }
            | Event::RollbackStarted { timestamp, .. }
            | Event::ActionRolledBack { timestamp, .. }
            | Event::RollbackFailed { timestamp, .. }
            | Event::RollbackCompleted { timestamp, .. } => *timestamp,
        }
    }

    /// Short snake_case name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Event::PlanStarted { .. } => "plan_started",
            Event::TaskStarted { .. } => "task_started",
            Event::TaskCompleted { .. } => "task_completed",
            Event::TaskFailed { .. } => "task_failed",
            Event::TaskRetrying { .. } => "task_retrying",
            Event::TaskSkipped { .. } => "task_skipped",
            Event::PlanHalted { .. } => "plan_halted",
            Event::PlanCompleted { .. } => "plan_completed",
            Event::RollbackStarted { .. } => "rollback_started",
            Event::ActionRolledBack { .. } => "action_rolled_back",
            Event::RollbackFailed { .. } => "rollback_failed",
            Event::RollbackCompleted { .. } => "rollback_completed",
        }
    }

    /// The task the event is about, if any.
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Event::TaskStarted { task_id, .. }
            | Event::TaskCompleted { task_id, .. }
            | Event::TaskFailed { task_id, .. }
            | Event::TaskRetrying { task_id, .. }
            | Event::TaskSkipped { task_id, .. }
            | Event::PlanHalted { task_id, .. }
            | Event::ActionRolledBack { task_id, .. }
            | Event::RollbackFailed { task_id, .. } => Some(task_id),
            Event::PlanStarted { .. }
            | Event::PlanCompleted { .. }
            | Event::RollbackStarted { .. }
            | Event::RollbackCompleted { .. } => None,
        }
    }

    pub fn plan_started(task_count: usize, dry_run: bool) -> Self {
        Event::PlanStarted {
            task_count,
            dry_run,
            timestamp: Instant::now(),
        }
    }

    pub fn task_started(task_id: TaskId) -> Self {
        Event::TaskStarted {
            task_id,
            timestamp: Instant::now(),
        }
    }

    pub fn task_completed(task_id: TaskId, duration: Duration, output: String) -> Self {
        Event::TaskCompleted {
            task_id,
            duration,
            output,
            timestamp: Instant::now(),
        }
    }

    pub fn task_failed(task_id: TaskId, duration: Duration, error: String) -> Self {
        Event::TaskFailed {
            task_id,
            duration,
            error,
            timestamp: Instant::now(),
        }
    }

    pub fn task_retrying(task_id: TaskId, retry: u32, max_retries: u32, delay: Duration) -> Self {
        Event::TaskRetrying {
            task_id,
            retry,
            max_retries,
            delay,
            timestamp: Instant::now(),
        }
    }

    pub fn task_skipped(task_id: TaskId, missing: Vec<TaskId>) -> Self {
        Event::TaskSkipped {
            task_id,
            missing,
            timestamp: Instant::now(),
        }
    }

    pub fn plan_halted(task_id: TaskId, error: String) -> Self {
        Event::PlanHalted {
            task_id,
            error,
            timestamp: Instant::now(),
        }
    }

    pub fn plan_completed(attempted: usize, succeeded: usize, halted: bool, duration: Duration) -> Self {
        Event::PlanCompleted {
            attempted,
            succeeded,
            halted,
            duration,
            timestamp: Instant::now(),
        }
    }

    pub fn rollback_started(action_count: usize) -> Self {
        Event::RollbackStarted {
            action_count,
            timestamp: Instant::now(),
        }
    }

    pub fn action_rolled_back(task_id: TaskId, description: String) -> Self {
        Event::ActionRolledBack {
            task_id,
            description,
            timestamp: Instant::now(),
        }
    }

    pub fn rollback_failed(task_id: TaskId, description: String, error: String) -> Self {
        Event::RollbackFailed {
            task_id,
            description,
            error,
            timestamp: Instant::now(),
        }
    }

    pub fn rollback_completed(undone: usize, failed: usize) -> Self {
        Event::RollbackCompleted {
            undone,
            failed,
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers, in registration order.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
