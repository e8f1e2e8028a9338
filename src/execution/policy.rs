//! Command allow-list and argument screening.
//!
//! Checks run before any process is spawned: the base command name must be
//! on the allow-list and the joined arguments must not contain a shell
//! metacharacter sequence. Either violation fails the task attempt with no
//! process started.

use std::collections::BTreeSet;

use crate::core::task::TaskError;

/// Commands allowed by default.
pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
    "npm", "npx", "cargo", "python", "python3", "node", "tsc", "git", "eslint", "prettier",
    "jest", "vitest", "mkdir", "cp", "mv", "rm",
];

/// Sequences rejected anywhere in the joined argument string.
pub const FORBIDDEN_SEQUENCES: &[&str] = &[";", "&&", "||", "|", "`", "$("];

/// Allow-list based command policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPolicy {
    allowed: BTreeSet<String>,
}

impl CommandPolicy {
    /// Policy allowing exactly the given base command names.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, base_command: &str) -> bool {
        self.allowed.contains(base_command)
    }

    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// Validate a command and its arguments.
    pub fn check(&self, command: &str, args: &[String]) -> Result<(), TaskError> {
        let base = base_command(command);
        if !self.is_allowed(base) {
            return Err(TaskError::CommandNotAllowed {
                command: base.to_string(),
                allowed: self.allowed().collect::<Vec<_>>().join(", "),
            });
        }
        check_arguments(args)
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_COMMANDS.iter().copied())
    }
}

/// Final path component of a command (`/usr/bin/git` → `git`).
pub fn base_command(command: &str) -> &str {
    command
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(command)
}

/// Reject arguments containing a forbidden sequence.
pub fn check_arguments(args: &[String]) -> Result<(), TaskError> {
    let joined = args.join(" ");
    match FORBIDDEN_SEQUENCES.iter().find(|seq| joined.contains(**seq)) {
        Some(seq) => Err(TaskError::UnsafeArgument((*seq).to_string())),
        None => Ok(()),
    }
}
