//! Common test utilities shared across integration tests.

use rollplan::testing::{InMemoryFileSystem, RecordingHandler, ScriptedProcessRunner, StaticAiProvider};
use rollplan::{EventBus, ExecutionContext, TaskExecutor};
use std::sync::Arc;
use std::time::Duration;

/// Working directory used by in-memory scenarios.
pub const WORKDIR: &str = "/work";

/// An executor wired to in-memory collaborators, plus handles to inspect them.
pub struct Fixture {
    pub fs: Arc<InMemoryFileSystem>,
    pub runner: Arc<ScriptedProcessRunner>,
    pub ai: Arc<StaticAiProvider>,
    pub events: Arc<RecordingHandler>,
    pub executor: TaskExecutor,
}

impl Fixture {
    /// Build a fixture whose retries back off in `base_delay` steps.
    pub async fn with_retry_delay(base_delay: Duration) -> Self {
        let fs = Arc::new(InMemoryFileSystem::new());
        let runner = Arc::new(ScriptedProcessRunner::new());
        let ai = Arc::new(StaticAiProvider::answering("ok"));
        let events = Arc::new(RecordingHandler::new());

        let bus = Arc::new(EventBus::new());
        bus.register(events.clone()).await;

        let executor = TaskExecutor::builder()
            .file_system(fs.clone())
            .process_runner(runner.clone())
            .ai_provider(ai.clone())
            .retry_base_delay(base_delay)
            .event_bus(bus)
            .build();

        Self {
            fs,
            runner,
            ai,
            events,
            executor,
        }
    }

    pub async fn new() -> Self {
        Self::with_retry_delay(Duration::from_millis(1)).await
    }

    pub fn path(&self, name: &str) -> String {
        format!("{}/{}", WORKDIR, name)
    }
}

pub fn context() -> ExecutionContext {
    ExecutionContext::new(WORKDIR)
}
