// src/dag/state_manager.rs

//! Line status transitions.
//!
//! Every change of a line's execution state goes through [`StateManager`], so
//! the legal transitions are visible in one place:
//!
//! - `Untreated → Executing` ([`StateManager::claim`])
//! - `Executing → Succeeded | Failed` ([`StateManager::complete`])
//! - `Untreated | Executing → Skipped` ([`StateManager::skip`])
//! - `Untreated → Succeeded` for lines with nothing to run
//!   ([`StateManager::complete_noop`])
//! - terminal → `Untreated` only through [`StateManager::reset_for_rerun`]

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::coord::WorkerIdentity;
use crate::script::{Line, LineIndex, SkipReason, Status};

pub struct StateManager<'a> {
    lines: &'a mut [Line],
}

impl<'a> StateManager<'a> {
    pub fn new(lines: &'a mut [Line]) -> Self {
        Self { lines }
    }

    /// Mark a line `Executing` for `worker`.
    ///
    /// Any result of a previous execution is cleared; this only matters for
    /// always lines, which a new session runs again.
    pub fn claim(&mut self, index: LineIndex, worker: &WorkerIdentity, now: DateTime<Utc>) {
        let Some(line) = line_mut(self.lines, index) else {
            return;
        };
        line.clear_execution();
        line.status = Status::Executing;
        line.start_time = Some(now);
        line.executed_by.push(worker.clone());
        debug!(line = index, worker = %worker, "line claimed");
    }

    /// Record the runner's result for a claimed line.
    pub fn complete(
        &mut self,
        index: LineIndex,
        exit_code: i32,
        output: String,
        now: DateTime<Utc>,
    ) {
        let Some(line) = line_mut(self.lines, index) else {
            return;
        };
        if line.status != Status::Executing {
            warn!(line = index, status = %line.status, "completing a line that is not executing");
        }
        line.status = if exit_code == 0 {
            Status::Succeeded
        } else {
            Status::Failed
        };
        line.retcode = Some(exit_code);
        line.output = Some(output);
        line.end_time = Some(now);
    }

    /// Complete a line that has no command to run.
    pub fn complete_noop(&mut self, index: LineIndex, worker: &WorkerIdentity, now: DateTime<Utc>) {
        let Some(line) = line_mut(self.lines, index) else {
            return;
        };
        line.status = Status::Succeeded;
        line.retcode = Some(0);
        line.start_time = Some(now);
        line.end_time = Some(now);
        line.executed_by.push(worker.clone());
    }

    pub fn skip(&mut self, index: LineIndex, reason: SkipReason, now: DateTime<Utc>) {
        let Some(line) = line_mut(self.lines, index) else {
            return;
        };
        line.status = Status::Skipped(reason);
        line.end_time = Some(now);
        debug!(line = index, status = %line.status, "line skipped");
    }

    /// Copy the execution result of `finished` onto the same line here.
    ///
    /// Used to merge a worker's own result into state reloaded from disk,
    /// which may carry other workers' changes to every other line.
    pub fn apply_result(&mut self, finished: &Line) {
        let Some(line) = line_mut(self.lines, finished.index) else {
            return;
        };
        line.status = finished.status;
        line.retcode = finished.retcode;
        line.output = finished.output.clone();
        line.start_time = finished.start_time;
        line.end_time = finished.end_time;
        if let Some(worker) = finished.executed_by.last() {
            if line.executed_by.last() != Some(worker) {
                line.executed_by.push(worker.clone());
            }
        }
    }

    /// Reset every `Failed` or `Skipped` line to `Untreated`, keeping
    /// `Succeeded` lines. Returns the number of lines reset.
    pub fn reset_for_rerun(&mut self) -> usize {
        let mut reset = 0;
        for line in self.lines.iter_mut() {
            if matches!(line.status, Status::Failed | Status::Skipped(_)) {
                line.clear_execution();
                reset += 1;
            }
        }
        debug!(reset, "failed and skipped lines reset for rerun");
        reset
    }

    pub fn all_terminal(&self) -> bool {
        all_terminal(self.lines)
    }
}

pub fn all_terminal(lines: &[Line]) -> bool {
    lines.iter().all(|l| l.status.is_terminal())
}

pub fn all_succeeded(lines: &[Line]) -> bool {
    lines.iter().all(|l| l.status == Status::Succeeded)
}

/// Lines not yet in a terminal state.
pub fn unfinished(lines: &[Line]) -> Vec<LineIndex> {
    lines
        .iter()
        .filter(|l| !l.status.is_terminal())
        .map(|l| l.index)
        .collect()
}

/// First line still marked `Executing`, if any.
pub fn first_executing(lines: &[Line]) -> Option<&Line> {
    lines.iter().find(|l| l.status == Status::Executing)
}

fn line_mut(lines: &mut [Line], index: LineIndex) -> Option<&mut Line> {
    let found = index.checked_sub(1).and_then(|i| lines.get_mut(i));
    if found.is_none() {
        warn!(line = index, "transition for unknown line; ignoring");
    }
    found
}
