//! Task execution engine.
//!
//! The `TaskExecutor` runs an ordered batch of tasks one at a time with:
//! - Dependency gating against the execution history
//! - Linear-backoff retries for retryable tasks
//! - Halting on the first non-retryable failure
//! - A LIFO rollback stack of undo operations for file effects
//!
//! Every failure inside a task is folded into its [`TaskResult`]; neither
//! [`TaskExecutor::execute_task`] nor [`TaskExecutor::execute_tasks`] returns
//! an error.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{Instrument, error, info, info_span, warn};

use crate::backend::{
    AiProvider, CommandInvocation, FileSystem, LocalFileSystem, ProcessRunner,
    SystemProcessRunner, UnconfiguredAiProvider,
};
use crate::config::ExecutorConfig;
use crate::core::context::ExecutionContext;
use crate::core::result::TaskResult;
use crate::core::retry::RetryPolicy;
use crate::core::rollback::{
    RollbackAction, RollbackFailure, RollbackOperation, RollbackReport, RollbackStack,
};
use crate::core::task::{LineChange, Task, TaskError, TaskKind, TaskStatus, ValidationType};
use crate::core::types::TaskId;
use crate::events::{Event, EventBus};

use super::changes::apply_line_changes;
use super::policy::{CommandPolicy, check_arguments};
use super::validation::ValidationCommand;

/// What a handler did: its summary and, for file effects, how to undo it.
struct Applied {
    output: String,
    undo: Option<RollbackOperation>,
}

impl Applied {
    fn output(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            undo: None,
        }
    }

    fn reversible(output: impl Into<String>, undo: RollbackOperation) -> Self {
        Self {
            output: output.into(),
            undo: Some(undo),
        }
    }
}

/// Sequential executor owning a plan's rollback stack and history.
///
/// One instance serves one plan; concurrent batches on the same instance
/// are ruled out by `&mut self`.
pub struct TaskExecutor {
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn ProcessRunner>,
    ai: Arc<dyn AiProvider>,
    policy: CommandPolicy,
    config: ExecutorConfig,
    events: Option<Arc<EventBus>>,
    rollback_stack: RollbackStack,
    history: HashMap<TaskId, TaskResult>,
}

impl TaskExecutor {
    /// Create an executor on the local filesystem and real processes, with
    /// no AI provider and default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TaskExecutorBuilder {
        TaskExecutorBuilder::new()
    }

    /// Attach an event bus for lifecycle events.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Snapshot of the execution history.
    ///
    /// The returned map is a copy; mutating it does not affect the executor.
    pub fn history(&self) -> HashMap<TaskId, TaskResult> {
        self.history.clone()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Pending undo actions, oldest first. Inspecting them runs nothing.
    pub fn rollback_stack(&self) -> &[RollbackAction] {
        self.rollback_stack.actions()
    }

    /// Drop all pending undo actions without running them.
    pub fn clear_rollback(&mut self) {
        self.rollback_stack.clear();
    }

    /// Execute a single task.
    ///
    /// Drives the task through `in-progress` to `completed` or `failed`,
    /// records the result in the history (replacing any earlier one for the
    /// same id) and, on success of a file effect, pushes its undo action.
    ///
    /// A task that is already `completed` is not run again: its recorded
    /// result is returned and becomes the history entry for its id. A task
    /// caught `in-progress` is refused with a failure that is neither
    /// recorded nor applied to the task.
    pub async fn execute_task(&mut self, task: &mut Task, ctx: &ExecutionContext) -> TaskResult {
        match self.attempt(task, ctx).await {
            Ok(result) => result,
            Err(err) => TaskResult::failure(err.to_string(), Duration::ZERO),
        }
    }

    /// Run one attempt of `task`. `Err` means the task was refused without
    /// running; every outcome of an actual run is an `Ok` result.
    async fn attempt(
        &mut self,
        task: &mut Task,
        ctx: &ExecutionContext,
    ) -> Result<TaskResult, TaskError> {
        if task.status() == TaskStatus::Completed {
            if let Some(previous) = task.result().cloned() {
                info!(task_id = %task.id, "task already completed, reusing its result");
                self.history.insert(task.id.clone(), previous.clone());
                return Ok(previous);
            }
        }

        let start = Instant::now();

        if let Err(err) = task.begin() {
            warn!(task_id = %task.id, error = %err, "refusing to execute task");
            return Err(err);
        }

        info!(
            task_id = %task.id,
            kind = task.kind.type_name(),
            description = %task.description,
            "executing task"
        );
        self.emit(Event::task_started(task.id.clone())).await;

        let outcome = self.dispatch(&task.kind, ctx).await;
        let duration = start.elapsed();

        let result = match outcome {
            Ok(applied) => {
                if let Some(undo) = applied.undo {
                    self.rollback_stack
                        .push(RollbackAction::new(task.id.clone(), undo));
                }
                info!(
                    task_id = %task.id,
                    duration_ms = duration.as_millis() as u64,
                    "task completed"
                );
                TaskResult::success(applied.output, duration)
            }
            Err(err) => {
                error!(task_id = %task.id, error = %err, "task failed");
                TaskResult::failure(err.to_string(), duration)
            }
        };

        task.finish(result.clone());
        self.history.insert(task.id.clone(), result.clone());

        let event = match (&result.output, &result.error) {
            (Some(output), _) => Event::task_completed(task.id.clone(), duration, output.clone()),
            (_, error) => Event::task_failed(
                task.id.clone(),
                duration,
                error.clone().unwrap_or_default(),
            ),
        };
        self.emit(event).await;

        Ok(result)
    }

    /// Execute an ordered batch.
    ///
    /// Returns one result per task in input order. The list is shorter than
    /// the input only when a non-retryable failure halted the batch; the
    /// halting task's result is the last entry.
    pub async fn execute_tasks(
        &mut self,
        tasks: &mut [Task],
        ctx: &ExecutionContext,
    ) -> Vec<TaskResult> {
        let span = info_span!(
            "plan_execution",
            task_count = tasks.len(),
            dry_run = ctx.dry_run
        );
        self.run_batch(tasks, ctx).instrument(span).await
    }

    async fn run_batch(&mut self, tasks: &mut [Task], ctx: &ExecutionContext) -> Vec<TaskResult> {
        let started = Instant::now();
        self.emit(Event::plan_started(tasks.len(), ctx.dry_run)).await;

        let mut results = Vec::with_capacity(tasks.len());
        let mut halted = false;

        for task in tasks.iter_mut() {
            let missing = self.unmet_dependencies(task);
            if !missing.is_empty() {
                warn!(
                    task_id = %task.id,
                    missing = ?missing.iter().map(TaskId::as_str).collect::<Vec<_>>(),
                    "skipping task due to unmet dependencies"
                );
                self.emit(Event::task_skipped(task.id.clone(), missing)).await;
                results.push(TaskResult::dependencies_not_met());
                continue;
            }

            let mut result = match self.attempt(task, ctx).await {
                Ok(result) => result,
                Err(err) => {
                    // Refused without running; never retried, never halts.
                    results.push(TaskResult::failure(err.to_string(), Duration::ZERO));
                    continue;
                }
            };

            if !result.success && !task.metadata.retryable {
                let reason = result.error.clone().unwrap_or_default();
                error!(task_id = %task.id, "stopping execution due to non-retryable failure");
                self.emit(Event::plan_halted(task.id.clone(), reason)).await;
                results.push(result);
                halted = true;
                break;
            }

            if !result.success {
                result = self.retry(task, ctx, result).await;
            }

            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            attempted = results.len(),
            succeeded,
            halted,
            "plan execution finished"
        );
        self.emit(Event::plan_completed(
            results.len(),
            succeeded,
            halted,
            started.elapsed(),
        ))
        .await;

        results
    }

    /// Retry a failed retryable task until it succeeds or the budget runs out.
    async fn retry(
        &mut self,
        task: &mut Task,
        ctx: &ExecutionContext,
        mut result: TaskResult,
    ) -> TaskResult {
        let policy = RetryPolicy::for_task(
            &task.metadata,
            self.config.default_max_retries,
            self.config.retry_base_delay(),
        );

        let mut retries = 0u32;
        while !result.success && policy.should_retry(retries) {
            retries += 1;
            let delay = policy.delay_for(retries);

            info!(
                task_id = %task.id,
                retry = retries,
                max_retries = policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                "retrying task"
            );
            self.emit(Event::task_retrying(
                task.id.clone(),
                retries,
                policy.max_retries,
                delay,
            ))
            .await;

            sleep(delay).await;
            result = match self.attempt(task, ctx).await {
                Ok(result) => result,
                Err(err) => return TaskResult::failure(err.to_string(), Duration::ZERO),
            };
        }

        if !result.success {
            warn!(task_id = %task.id, retries, "retries exhausted, continuing with next task");
        }

        result
    }

    /// Dependencies of `task` without a successful history entry, in
    /// declaration order.
    fn unmet_dependencies(&self, task: &Task) -> Vec<TaskId> {
        task.metadata
            .dependencies
            .iter()
            .filter(|dep| !self.history.get(*dep).is_some_and(|r| r.success))
            .cloned()
            .collect()
    }

    /// Undo every pending action, most recent first.
    ///
    /// A failing undo is logged and reported; the remaining actions are
    /// still attempted. The stack is empty afterwards. Task status and
    /// history are left untouched.
    pub async fn rollback(&mut self) -> RollbackReport {
        let mut report = RollbackReport::default();
        info!(actions = self.rollback_stack.len(), "rolling back");
        self.emit(Event::rollback_started(self.rollback_stack.len()))
            .await;

        while let Some(action) = self.rollback_stack.pop() {
            info!(task_id = %action.task_id, "{}", action.description);

            match self.undo(&action.operation).await {
                Ok(()) => {
                    self.emit(Event::action_rolled_back(
                        action.task_id.clone(),
                        action.description.clone(),
                    ))
                    .await;
                    report.undone.push(action);
                }
                Err(err) => {
                    error!(
                        task_id = %action.task_id,
                        error = %err,
                        "rollback failed: {}",
                        action.description
                    );
                    self.emit(Event::rollback_failed(
                        action.task_id.clone(),
                        action.description.clone(),
                        err.to_string(),
                    ))
                    .await;
                    report.failed.push(RollbackFailure {
                        action,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            undone = report.undone.len(),
            failed = report.failed.len(),
            "rollback complete"
        );
        self.emit(Event::rollback_completed(
            report.undone.len(),
            report.failed.len(),
        ))
        .await;

        report
    }

    async fn undo(&self, operation: &RollbackOperation) -> Result<(), TaskError> {
        match operation {
            RollbackOperation::DeleteFile { path } => self
                .fs
                .remove(path)
                .await
                .map_err(|e| TaskError::io(path, e)),
            RollbackOperation::RestoreFile { path, content } => self
                .fs
                .write_text(path, content)
                .await
                .map_err(|e| TaskError::io(path, e)),
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(bus) = &self.events {
            bus.emit(event).await;
        }
    }

    async fn dispatch(&self, kind: &TaskKind, ctx: &ExecutionContext) -> Result<Applied, TaskError> {
        match kind {
            TaskKind::FileCreate { file_path, content } => {
                self.create_file(file_path, content, ctx).await
            }
            TaskKind::FileModify { file_path, changes } => {
                self.modify_file(file_path, changes, ctx).await
            }
            TaskKind::FileDelete { file_path } => self.delete_file(file_path, ctx).await,
            TaskKind::CommandRun { command, args } => self.run_command(command, args, ctx).await,
            TaskKind::AiQuery { query } => self.query_ai(query, ctx).await,
            TaskKind::Validation {
                validation_type,
                target,
            } => self.validate(*validation_type, target.as_deref(), ctx).await,
        }
    }

    async fn create_file(
        &self,
        file_path: &Path,
        content: &str,
        ctx: &ExecutionContext,
    ) -> Result<Applied, TaskError> {
        if ctx.dry_run {
            return Ok(Applied::output(format!(
                "[DRY RUN] Would create file: {}",
                file_path.display()
            )));
        }

        let path = ctx.resolve(file_path);
        if self.fs.exists(&path).await.map_err(|e| TaskError::io(&path, e))? {
            return Err(TaskError::FileExists(file_path.to_path_buf()));
        }

        self.fs
            .write_text(&path, content)
            .await
            .map_err(|e| TaskError::io(&path, e))?;

        Ok(Applied::reversible(
            format!("Created file: {}", file_path.display()),
            RollbackOperation::DeleteFile { path },
        ))
    }

    async fn modify_file(
        &self,
        file_path: &Path,
        changes: &[LineChange],
        ctx: &ExecutionContext,
    ) -> Result<Applied, TaskError> {
        if ctx.dry_run {
            return Ok(Applied::output(format!(
                "[DRY RUN] Would modify file: {}",
                file_path.display()
            )));
        }

        let path = ctx.resolve(file_path);
        let original = self
            .fs
            .read_text(&path)
            .await
            .map_err(|e| TaskError::io(&path, e))?;
        let modified = apply_line_changes(&original, changes)?;

        self.fs
            .write_text(&path, &modified)
            .await
            .map_err(|e| TaskError::io(&path, e))?;

        Ok(Applied::reversible(
            format!("Modified file: {}", file_path.display()),
            RollbackOperation::RestoreFile {
                path,
                content: original,
            },
        ))
    }

    async fn delete_file(&self, file_path: &Path, ctx: &ExecutionContext) -> Result<Applied, TaskError> {
        if ctx.dry_run {
            return Ok(Applied::output(format!(
                "[DRY RUN] Would delete file: {}",
                file_path.display()
            )));
        }

        let path = ctx.resolve(file_path);
        let content = self
            .fs
            .read_text(&path)
            .await
            .map_err(|e| TaskError::io(&path, e))?;

        self.fs
            .remove(&path)
            .await
            .map_err(|e| TaskError::io(&path, e))?;

        Ok(Applied::reversible(
            format!("Deleted file: {}", file_path.display()),
            RollbackOperation::RestoreFile { path, content },
        ))
    }

    async fn run_command(
        &self,
        command: &str,
        args: &[String],
        ctx: &ExecutionContext,
    ) -> Result<Applied, TaskError> {
        if ctx.dry_run {
            let line = std::iter::once(command)
                .chain(args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            return Ok(Applied::output(format!("[DRY RUN] Would run command: {line}")));
        }

        self.policy.check(command, args)?;

        let invocation = self.invocation(command, args, ctx);

        let output = self.runner.run(&invocation).await?;
        if !output.success() {
            return Err(TaskError::CommandFailed {
                code: output.exit_code,
                stderr: output.stderr,
            });
        }

        Ok(Applied::output(output.stdout))
    }

    async fn query_ai(&self, query: &str, ctx: &ExecutionContext) -> Result<Applied, TaskError> {
        if ctx.dry_run {
            return Ok(Applied::output(format!("[DRY RUN] Would query AI: {query}")));
        }

        let response = self.ai.ask(query).await?;
        Ok(Applied::output(response))
    }

    async fn validate(
        &self,
        kind: ValidationType,
        target: Option<&str>,
        ctx: &ExecutionContext,
    ) -> Result<Applied, TaskError> {
        if ctx.dry_run {
            let subject = target.map_or_else(|| kind.to_string(), |t| format!("{t} ({kind})"));
            return Ok(Applied::output(format!("[DRY RUN] Would validate: {subject}")));
        }

        let command = ValidationCommand::for_type(kind, target);
        check_arguments(&command.args)?;

        let invocation = self.invocation(command.program, &command.args, ctx);
        let output = self.runner.run(&invocation).await?;

        command
            .interpret(&output, self.config.test_output_limit)
            .map(Applied::output)
    }

    fn invocation(&self, program: &str, args: &[String], ctx: &ExecutionContext) -> CommandInvocation {
        CommandInvocation::builder(program)
            .args(args.iter().cloned())
            .working_dir(ctx.working_directory.clone())
            .environment(ctx.environment.clone())
            .maybe_timeout(self.config.command_timeout())
            .build()
    }
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`TaskExecutor`].
///
/// Unset collaborators default to [`LocalFileSystem`],
/// [`SystemProcessRunner`] and [`UnconfiguredAiProvider`].
pub struct TaskExecutorBuilder {
    fs: Option<Arc<dyn FileSystem>>,
    runner: Option<Arc<dyn ProcessRunner>>,
    ai: Option<Arc<dyn AiProvider>>,
    config: ExecutorConfig,
    events: Option<Arc<EventBus>>,
}

impl TaskExecutorBuilder {
    pub fn new() -> Self {
        Self {
            fs: None,
            runner: None,
            ai: None,
            config: ExecutorConfig::default(),
            events: None,
        }
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn process_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn ai_provider(mut self, ai: Arc<dyn AiProvider>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Shorthand for overriding the retry backoff base.
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn build(self) -> TaskExecutor {
        TaskExecutor {
            fs: self.fs.unwrap_or_else(|| Arc::new(LocalFileSystem::new())),
            runner: self
                .runner
                .unwrap_or_else(|| Arc::new(SystemProcessRunner::new())),
            ai: self.ai.unwrap_or_else(|| Arc::new(UnconfiguredAiProvider)),
            policy: self.config.command_policy(),
            config: self.config,
            events: self.events,
            rollback_stack: RollbackStack::new(),
            history: HashMap::new(),
        }
    }
}

impl Default for TaskExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
