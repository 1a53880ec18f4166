// src/engine/report.rs

use std::fmt;

use crate::script::{render_lines, Line, LineIndex, Status};

/// How a worker's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every line reached a terminal state.
    Completed,
    /// An `always` line did not succeed; nothing after it was started.
    AbortedByAlways { line: LineIndex },
    /// No progress was possible; these lines are still unfinished.
    Stalled { blocked: Vec<LineIndex> },
    /// The run never started (operator abort, nothing left to do).
    NotStarted { reason: String },
}

/// Summary of one worker's run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Final line states as this worker last saw them.
    pub lines: Vec<Line>,
    /// Lines this worker handed to the command runner.
    pub executed: Vec<LineIndex>,
}

impl RunReport {
    pub fn not_started(reason: impl Into<String>) -> Self {
        Self {
            outcome: RunOutcome::NotStarted {
                reason: reason.into(),
            },
            lines: Vec::new(),
            executed: Vec::new(),
        }
    }

    pub fn count(&self, pred: impl Fn(Status) -> bool) -> usize {
        self.lines.iter().filter(|l| pred(l.status)).count()
    }

    pub fn failed(&self) -> usize {
        self.count(|s| s == Status::Failed)
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| s == Status::Succeeded)
    }

    pub fn skipped(&self) -> usize {
        self.count(Status::is_skipped)
    }

    pub fn status_of(&self, index: LineIndex) -> Option<Status> {
        index
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(|l| l.status)
    }

    /// Process exit status for this run.
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            RunOutcome::Completed if self.failed() == 0 => 0,
            RunOutcome::NotStarted { .. } => 0,
            _ => 1,
        }
    }

    pub fn render(&self) -> String {
        render_lines(&self.lines)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            RunOutcome::Completed => f.write_str("DONE.")?,
            RunOutcome::AbortedByAlways { line } => {
                write!(f, "Always-required command on line {line} failed. Aborted.")?
            }
            RunOutcome::Stalled { blocked } => {
                write!(f, "STALLED: no progress possible for lines {blocked:?}.")?
            }
            RunOutcome::NotStarted { reason } => return write!(f, "Not started: {reason}."),
        }
        write!(
            f,
            " {} succeeded, {} failed, {} skipped, {} executed by this worker.",
            self.succeeded(),
            self.failed(),
            self.skipped(),
            self.executed.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: RunOutcome, statuses: &[Status]) -> RunReport {
        let lines = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut line = Line::new(i + 1, Some(format!("cmd{i}")), format!("cmd{i}"));
                line.status = *s;
                line
            })
            .collect();
        RunReport {
            outcome,
            lines,
            executed: Vec::new(),
        }
    }

    #[test]
    fn exit_code_reflects_failures_and_outcome() {
        assert_eq!(report(RunOutcome::Completed, &[Status::Succeeded]).exit_code(), 0);
        assert_eq!(
            report(RunOutcome::Completed, &[Status::Succeeded, Status::Failed]).exit_code(),
            1
        );
        assert_eq!(
            report(RunOutcome::AbortedByAlways { line: 1 }, &[Status::Failed]).exit_code(),
            1
        );
        assert_eq!(
            report(RunOutcome::Stalled { blocked: vec![1] }, &[Status::Untreated]).exit_code(),
            1
        );
        assert_eq!(RunReport::not_started("aborted by operator").exit_code(), 0);
    }

    #[test]
    fn summary_counts_lines() {
        let r = report(
            RunOutcome::Completed,
            &[
                Status::Succeeded,
                Status::Failed,
                Status::Skipped(crate::script::SkipReason::DependencyFailed(2)),
            ],
        );
        assert_eq!(
            r.to_string(),
            "DONE. 1 succeeded, 1 failed, 1 skipped, 0 executed by this worker."
        );
    }
}
