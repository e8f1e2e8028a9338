//! Testing utilities for users of the rollplan library.
//!
//! This module provides in-memory and scripted collaborators so executor
//! behavior can be checked without touching disk or spawning processes:
//!
//! - [`InMemoryFileSystem`]: A file map that logs every operation and can
//!   inject failures
//! - [`ScriptedProcessRunner`]: A spy runner returning queued outputs
//! - [`StaticAiProvider`]: An AI provider with a fixed answer or error
//! - [`RecordingHandler`]: An event handler that keeps every event

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::{AiError, AiProvider, CommandInvocation, FileSystem, ProcessOutput, ProcessRunner};
use crate::core::task::TaskError;
use crate::events::{Event, EventHandler};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A filesystem call observed by [`InMemoryFileSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOperation {
    Exists(PathBuf),
    Read(PathBuf),
    Write(PathBuf),
    Remove(PathBuf),
}

/// An in-memory [`FileSystem`].
///
/// # Example
///
/// ```
/// use rollplan::testing::InMemoryFileSystem;
///
/// let fs = InMemoryFileSystem::new().with_file("/work/a.txt", "hello");
///
/// assert_eq!(fs.contents("/work/a.txt").as_deref(), Some("hello"));
/// assert_eq!(fs.operation_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
    operations: Mutex<Vec<FsOperation>>,
    failing_writes: Mutex<HashSet<PathBuf>>,
    failing_removals: Mutex<HashSet<PathBuf>>,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed a file.
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Seed or overwrite a file without logging an operation.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        lock(&self.files).insert(path.into(), content.into());
    }

    /// Current content of a file.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        lock(&self.files).get(path.as_ref()).cloned()
    }

    pub fn has(&self, path: impl AsRef<Path>) -> bool {
        lock(&self.files).contains_key(path.as_ref())
    }

    /// Snapshot of every file.
    pub fn files(&self) -> BTreeMap<PathBuf, String> {
        lock(&self.files).clone()
    }

    /// Calls made through the [`FileSystem`] trait, in order.
    pub fn operations(&self) -> Vec<FsOperation> {
        lock(&self.operations).clone()
    }

    pub fn operation_count(&self) -> usize {
        lock(&self.operations).len()
    }

    /// Make every later write to `path` fail with `PermissionDenied`.
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        lock(&self.failing_writes).insert(path.into());
    }

    /// Make every later removal of `path` fail with `PermissionDenied`.
    pub fn fail_removals_of(&self, path: impl Into<PathBuf>) {
        lock(&self.failing_removals).insert(path.into());
    }

    fn record(&self, op: FsOperation) {
        lock(&self.operations).push(op);
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
}

fn denied(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("{} is read-only", path.display()),
    )
}

#[async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        self.record(FsOperation::Exists(path.to_path_buf()));
        Ok(self.has(path))
    }

    async fn read_text(&self, path: &Path) -> io::Result<String> {
        self.record(FsOperation::Read(path.to_path_buf()));
        self.contents(path).ok_or_else(|| not_found(path))
    }

    async fn write_text(&self, path: &Path, content: &str) -> io::Result<()> {
        self.record(FsOperation::Write(path.to_path_buf()));
        if lock(&self.failing_writes).contains(path) {
            return Err(denied(path));
        }
        self.insert(path, content);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        self.record(FsOperation::Remove(path.to_path_buf()));
        if lock(&self.failing_removals).contains(path) {
            return Err(denied(path));
        }
        lock(&self.files)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Exit(ProcessOutput),
    SpawnError(String),
}

/// A spy [`ProcessRunner`] that records invocations and replays queued outputs.
///
/// Once the queue is empty every call gets the fallback output, which is a
/// silent success unless changed with [`ScriptedProcessRunner::fail_all`].
#[derive(Debug, Default)]
pub struct ScriptedProcessRunner {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<ProcessOutput>,
    calls: Mutex<Vec<CommandInvocation>>,
}

impl ScriptedProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output of the next call.
    pub fn push(&self, output: ProcessOutput) {
        lock(&self.script).push_back(Scripted::Exit(output));
    }

    /// Queue an exit with the given code and streams.
    pub fn push_exit(&self, exit_code: i32, stdout: &str, stderr: &str) {
        self.push(ProcessOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
    }

    /// Queue a call that fails to start.
    pub fn push_spawn_error(&self, message: impl Into<String>) {
        lock(&self.script).push_back(Scripted::SpawnError(message.into()));
    }

    /// Answer unscripted calls with a non-zero exit.
    pub fn fail_all(&self, exit_code: i32, stderr: &str) {
        *lock(&self.fallback) = ProcessOutput {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        };
    }

    /// Invocations received so far, in order.
    pub fn calls(&self) -> Vec<CommandInvocation> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedProcessRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<ProcessOutput, TaskError> {
        lock(&self.calls).push(invocation.clone());

        let next = lock(&self.script).pop_front();
        match next {
            Some(Scripted::Exit(output)) => Ok(output),
            Some(Scripted::SpawnError(message)) => Err(TaskError::ExecutionFailed(message)),
            None => Ok(lock(&self.fallback).clone()),
        }
    }
}

/// An [`AiProvider`] with a fixed answer or a fixed error.
#[derive(Debug)]
pub struct StaticAiProvider {
    reply: Result<String, AiError>,
    queries: Mutex<Vec<String>>,
}

impl StaticAiProvider {
    /// Answer every query with `answer`.
    pub fn answering(answer: impl Into<String>) -> Self {
        Self {
            reply: Ok(answer.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Fail every query with a provider error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(AiError::Provider(message.into())),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl AiProvider for StaticAiProvider {
    async fn ask(&self, query: &str) -> Result<String, AiError> {
        lock(&self.queries).push(query.to_string());
        self.reply.clone()
    }
}

/// An [`EventHandler`] that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: tokio::sync::Mutex<Vec<Event>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    /// Event kind names, in arrival order.
    pub async fn names(&self) -> Vec<&'static str> {
        self.events.lock().await.iter().map(Event::name).collect()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &Event) {
        self.events.lock().await.push(event.clone());
    }
}
