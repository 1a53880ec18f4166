// src/script/line.rs

//! Per-line data model and status state.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::coord::WorkerIdentity;

/// 1-based line number in the original script.
pub type LineIndex = usize;

/// Lifecycle of a line within one run attempt.
///
/// `Untreated → {Executing → {Succeeded, Failed}, Skipped}`. Terminal states
/// only go back to `Untreated` through an explicit rerun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Untreated,
    Executing,
    Succeeded,
    Failed,
    Skipped(SkipReason),
}

/// Why a line ended up `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The operator declined the line at the interactive prompt.
    Operator,
    /// A dependency failed.
    DependencyFailed(LineIndex),
    /// A dependency was itself skipped.
    DependencySkipped(LineIndex),
}

impl Status {
    /// `Succeeded`, `Failed` or `Skipped`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Succeeded | Status::Failed | Status::Skipped(_)
        )
    }

    pub fn is_skipped(self) -> bool {
        matches!(self, Status::Skipped(_))
    }

    /// Two-column marker used when rendering the script state.
    pub fn symbol(self) -> &'static str {
        match self {
            Status::Untreated => "  ",
            Status::Skipped(_) => "- ",
            Status::Executing => "->",
            Status::Succeeded => "✓ ",
            Status::Failed => "✗ ",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Untreated => f.write_str("UNTREATED"),
            Status::Executing => f.write_str("EXECUTING"),
            Status::Succeeded => f.write_str("SUCCEEDED"),
            Status::Failed => f.write_str("FAILED"),
            Status::Skipped(SkipReason::Operator) => f.write_str("SKIPPED (operator)"),
            Status::Skipped(SkipReason::DependencyFailed(dep)) => {
                write!(f, "SKIPPED (line {dep} failed)")
            }
            Status::Skipped(SkipReason::DependencySkipped(dep)) => {
                write!(f, "SKIPPED (line {dep} skipped)")
            }
        }
    }
}

/// Execution mode set by the `always` / `always-try` directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlwaysMode {
    #[default]
    No,
    /// Run regardless of dependencies; a failure aborts the run.
    Always,
    /// Run regardless of dependencies; a failure is recorded only.
    AlwaysTry,
}

impl AlwaysMode {
    pub fn is_always(self) -> bool {
        !matches!(self, AlwaysMode::No)
    }
}

impl fmt::Display for AlwaysMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlwaysMode::No => f.write_str("no"),
            AlwaysMode::Always => f.write_str("always"),
            AlwaysMode::AlwaysTry => f.write_str("always-try"),
        }
    }
}

/// One physical line of the script plus its execution state.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub index: LineIndex,
    /// Continuation-resolved command; `None` for blank lines and for lines
    /// absorbed by a continuation.
    pub command: Option<String>,
    pub original_text: String,
    pub status: Status,
    pub dependencies: BTreeSet<LineIndex>,
    pub tag: Option<String>,
    pub always: AlwaysMode,
    pub retcode: Option<i32>,
    pub output: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub executed_by: Vec<WorkerIdentity>,
}

impl Line {
    pub fn new(index: LineIndex, command: Option<String>, original_text: impl Into<String>) -> Self {
        Self {
            index,
            command,
            original_text: original_text.into(),
            status: Status::Untreated,
            dependencies: BTreeSet::new(),
            tag: None,
            always: AlwaysMode::No,
            retcode: None,
            output: None,
            start_time: None,
            end_time: None,
            executed_by: Vec::new(),
        }
    }

    pub fn is_comment(&self) -> bool {
        self.command
            .as_deref()
            .is_some_and(|c| c.trim_start().starts_with('#'))
    }

    /// Whether the line has a command the shell needs to run.
    ///
    /// Blank lines, continuation placeholders and comments complete without
    /// touching the command runner.
    pub fn is_runnable(&self) -> bool {
        self.command.is_some() && !self.is_comment()
    }

    /// Drop everything an execution attempt recorded, keeping the shape.
    pub fn clear_execution(&mut self) {
        self.status = Status::Untreated;
        self.retcode = None;
        self.output = None;
        self.start_time = None;
        self.end_time = None;
    }
}

/// Render lines as `<symbol> <index> <text>`, one per line.
///
/// Lines without a command get neither symbol nor index, like the script
/// listing an operator would read.
pub fn render_lines(lines: &[Line]) -> String {
    let mut out = String::new();
    for line in lines {
        if line.command.is_none() {
            out.push_str(&format!("      {}\n", line.original_text));
        } else {
            out.push_str(&format!(
                "{} {:>3} {}\n",
                line.status.symbol(),
                line.index,
                line.original_text
            ));
        }
    }
    out
}
