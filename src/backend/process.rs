//! Process-execution collaborator.
//!
//! The executor describes every external program it wants to run as a
//! [`CommandInvocation`] and hands it to a [`ProcessRunner`]. The runner
//! only spawns and collects output; deciding what is allowed to run is
//! done beforehand by [`CommandPolicy`](crate::execution::CommandPolicy).
//!
//! ```rust
//! use rollplan::backend::CommandInvocation;
//! use std::time::Duration;
//!
//! let invocation = CommandInvocation::builder("npm")
//!     .args(["run", "build"])
//!     .working_dir("/srv/app")
//!     .env("CI", "true")
//!     .timeout(Duration::from_secs(600))
//!     .build();
//!
//! assert_eq!(invocation.display(), "npm run build");
//! ```

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::environment::Environment;
use crate::core::task::TaskError;

/// A fully described program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub environment: Environment,
    pub timeout: Option<Duration>,
}

impl CommandInvocation {
    pub fn builder(program: impl Into<String>) -> CommandInvocationBuilder {
        CommandInvocationBuilder::new(program)
    }

    /// Program and arguments joined by spaces, for logs and messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builder for [`CommandInvocation`].
#[derive(Debug, Clone)]
pub struct CommandInvocationBuilder {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    environment: Environment,
    timeout: Option<Duration>,
}

impl CommandInvocationBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            environment: Environment::default(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = env;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.set(key, value);
        self
    }

    /// Kill the process if it runs longer than `duration`.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    pub fn maybe_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout = duration;
        self
    }

    pub fn build(self) -> CommandInvocation {
        CommandInvocation {
            program: self.program,
            args: self.args,
            working_dir: self.working_dir,
            environment: self.environment,
            timeout: self.timeout,
        }
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; -1 when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external programs.
///
/// A non-zero exit is not an error at this level; it is reported through
/// [`ProcessOutput::exit_code`]. Errors mean the process could not be run
/// at all ([`TaskError::ExecutionFailed`]) or overran its timeout
/// ([`TaskError::Timeout`]).
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &CommandInvocation) -> Result<ProcessOutput, TaskError>;
}

/// [`ProcessRunner`] that spawns real processes with `tokio::process`.
///
/// Programs are started directly, never through a shell. On timeout the
/// child is killed when its future is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<ProcessOutput, TaskError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        for (key, value) in invocation.environment.iter() {
            cmd.env(key, value);
        }

        if let Some(ref dir) = invocation.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = match invocation.timeout {
            Some(duration) => timeout(duration, cmd.output())
                .await
                .map_err(|_| TaskError::Timeout(duration))?
                .map_err(|e| {
                    TaskError::ExecutionFailed(format!("{}: {}", invocation.program, e))
                })?,
            None => cmd.output().await.map_err(|e| {
                TaskError::ExecutionFailed(format!("{}: {}", invocation.program, e))
            })?,
        };

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
