//! Line-level edits for file-modify tasks.

use crate::core::task::{ChangeOp, LineChange, TaskError};

/// Apply `changes` in order to `content` and return the new text.
///
/// The content is split on `'\n'` and joined back with `'\n'`, so a
/// trailing newline shows up as a final empty line and survives the edit.
/// Line indices are 0-based and refer to the line array as it stands when
/// the change is applied, after every earlier change.
///
/// - `insert` puts `content` before `line`, or appends when `line` is
///   absent or past the end.
/// - `delete` removes the line at `line`; with no line, or one past the
///   end, there is nothing to remove and the change is a no-op.
/// - `replace` overwrites the line at `line`. It needs a `line` inside the
///   array; anything else is rejected and nothing is applied.
pub fn apply_line_changes(content: &str, changes: &[LineChange]) -> Result<String, TaskError> {
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();

    for (index, change) in changes.iter().enumerate() {
        match change.op {
            ChangeOp::Insert => match change.line {
                Some(line) if line < lines.len() => lines.insert(line, change.content.clone()),
                _ => lines.push(change.content.clone()),
            },
            ChangeOp::Delete => {
                if let Some(line) = change.line.filter(|&line| line < lines.len()) {
                    lines.remove(line);
                }
            }
            ChangeOp::Replace => {
                let line = target_line(index, change, lines.len())?;
                lines[line] = change.content.clone();
            }
        }
    }

    Ok(lines.join("\n"))
}

fn target_line(index: usize, change: &LineChange, len: usize) -> Result<usize, TaskError> {
    match change.line {
        Some(line) if line < len => Ok(line),
        Some(line) => Err(TaskError::InvalidChange(format!(
            "change {index}: line {line} is out of range (file has {len} lines)"
        ))),
        None => Err(TaskError::InvalidChange(format!(
            "change {index}: {:?} requires a line number",
            change.op
        ))),
    }
}
