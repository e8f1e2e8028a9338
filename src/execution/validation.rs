//! Fixed toolchain invocations behind validation tasks.
//!
//! | type     | command                                  | diagnostics on |
//! |----------|------------------------------------------|----------------|
//! | `syntax` | `tsc --noEmit --skipLibCheck`            | stderr         |
//! | `lint`   | `npx eslint <target or .> --max-warnings=0` | stdout      |
//! | `test`   | `npm test -- --passWithNoTests`          | stdout         |
//! | `build`  | `npm run build`                          | stderr         |

use crate::backend::ProcessOutput;
use crate::core::task::{TaskError, ValidationType};

/// Which output stream carries a tool's diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    Stdout,
    Stderr,
}

impl OutputChannel {
    pub fn select<'a>(&self, output: &'a ProcessOutput) -> &'a str {
        match self {
            OutputChannel::Stdout => &output.stdout,
            OutputChannel::Stderr => &output.stderr,
        }
    }
}

/// The external invocation for one validation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationCommand {
    pub kind: ValidationType,
    pub program: &'static str,
    pub args: Vec<String>,
    pub diagnostics: OutputChannel,
}

impl ValidationCommand {
    /// Build the invocation for `kind`. Only lint uses `target`.
    pub fn for_type(kind: ValidationType, target: Option<&str>) -> Self {
        let (program, args, diagnostics) = match kind {
            ValidationType::Syntax => (
                "tsc",
                vec!["--noEmit", "--skipLibCheck"],
                OutputChannel::Stderr,
            ),
            ValidationType::Lint => (
                "npx",
                vec!["eslint", target.unwrap_or("."), "--max-warnings=0"],
                OutputChannel::Stdout,
            ),
            ValidationType::Test => (
                "npm",
                vec!["test", "--", "--passWithNoTests"],
                OutputChannel::Stdout,
            ),
            ValidationType::Build => ("npm", vec!["run", "build"], OutputChannel::Stderr),
        };

        Self {
            kind,
            program,
            args: args.into_iter().map(str::to_string).collect(),
            diagnostics,
        }
    }

    /// Turn the finished process into the task outcome.
    ///
    /// `output_limit` caps how many characters of test-runner stdout are
    /// echoed in a passing test run's summary.
    pub fn interpret(&self, output: &ProcessOutput, output_limit: usize) -> Result<String, TaskError> {
        if !output.success() {
            return Err(TaskError::ValidationFailed {
                kind: self.kind,
                output: self.diagnostics.select(output).to_string(),
            });
        }

        Ok(match self.kind {
            ValidationType::Syntax => "TypeScript syntax check passed".to_string(),
            ValidationType::Lint => "Lint check passed".to_string(),
            ValidationType::Test => {
                let excerpt: String = output.stdout.chars().take(output_limit).collect();
                format!("Tests passed:\n{excerpt}")
            }
            ValidationType::Build => "Build succeeded".to_string(),
        })
    }
}
