//! Collaborator interfaces the executor calls into.
//!
//! Each interface is an async trait with a production implementation:
//!
//! - [`FileSystem`] / [`LocalFileSystem`]
//! - [`ProcessRunner`] / [`SystemProcessRunner`]
//! - [`AiProvider`] / [`UnconfiguredAiProvider`]
//!
//! Test doubles for all three live in [`crate::testing`].

mod ai;
mod fs;
mod process;

pub use ai::{AiError, AiProvider, UnconfiguredAiProvider};
pub use fs::{FileSystem, LocalFileSystem};
pub use process::{
    CommandInvocation, CommandInvocationBuilder, ProcessOutput, ProcessRunner,
    SystemProcessRunner,
};
