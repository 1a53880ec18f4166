// src/dag/scheduler.rs

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};

use crate::coord::WorkerIdentity;
use crate::dag::graph::DependencyGraph;
use crate::dag::state_manager::StateManager;
use crate::dag::step::{Decision, SweepStep};
use crate::script::{Line, LineIndex, Script, SkipReason, Status};

/// Scheduler holds the immutable dependency graph of a script.
///
/// Line state is owned by the caller and passed into each call, because in
/// distributed mode it is reloaded from the checkpoint before every sweep.
///
/// Rules, in order:
/// 1. always lines run once per worker session, whatever their status and
///    dependencies;
/// 2. lines not `Untreated` are left alone;
/// 3. an `Untreated` line waits while any dependency is pending or running,
///    is skipped if any dependency failed or was skipped, and is eligible
///    otherwise.
#[derive(Debug, Clone)]
pub struct Scheduler {
    graph: DependencyGraph,
}

impl Scheduler {
    pub fn new(script: &Script) -> Self {
        Self::from_lines(script.lines())
    }

    pub fn from_lines(lines: &[Line]) -> Self {
        Self {
            graph: DependencyGraph::from_lines(lines),
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Decide what to do with line `index` given the current `lines`.
    ///
    /// `session_ran` holds the always lines this worker has already run.
    pub fn decide(
        &self,
        lines: &[Line],
        index: LineIndex,
        session_ran: &HashSet<LineIndex>,
    ) -> Decision {
        let Some(line) = index.checked_sub(1).and_then(|i| lines.get(i)) else {
            return Decision::Untouched;
        };

        if line.always.is_always() {
            if session_ran.contains(&index) {
                return Decision::Untouched;
            }
            return eligible(line);
        }

        if line.status != Status::Untreated {
            return Decision::Untouched;
        }

        let mut failed = None;
        let mut skipped = None;
        for &dep in self.graph.dependencies_of(index) {
            let Some(dep_line) = dep.checked_sub(1).and_then(|i| lines.get(i)) else {
                continue;
            };
            match dep_line.status {
                Status::Untreated | Status::Executing => return Decision::Defer,
                Status::Failed => {
                    failed.get_or_insert(dep);
                }
                Status::Skipped(_) => {
                    skipped.get_or_insert(dep);
                }
                Status::Succeeded => {}
            }
        }

        match (failed, skipped) {
            (Some(dep), _) => Decision::Skip(SkipReason::DependencyFailed(dep)),
            (None, Some(dep)) => Decision::Skip(SkipReason::DependencySkipped(dep)),
            (None, None) => eligible(line),
        }
    }

    /// Walk the lines in index order, applying skips and no-op completions,
    /// until the first line that needs the runner.
    pub fn sweep(
        &self,
        lines: &mut [Line],
        session_ran: &mut HashSet<LineIndex>,
        worker: &WorkerIdentity,
    ) -> SweepStep {
        let mut step = SweepStep::default();
        let now = Utc::now();

        for index in 1..=lines.len() {
            match self.decide(lines, index, session_ran) {
                Decision::Run => {
                    step.next_run = Some(index);
                    break;
                }
                Decision::Complete => {
                    StateManager::new(lines).complete_noop(index, worker, now);
                    if lines[index - 1].always.is_always() {
                        session_ran.insert(index);
                    }
                    step.newly_completed.push(index);
                }
                Decision::Skip(reason) => {
                    info!(line = index, reason = ?reason, "skipping line");
                    StateManager::new(lines).skip(index, reason, now);
                    step.newly_skipped.push(index);
                }
                Decision::Defer => step.deferred.push(index),
                Decision::Untouched => {}
            }
        }

        debug!(
            skipped = step.newly_skipped.len(),
            completed = step.newly_completed.len(),
            deferred = step.deferred.len(),
            next_run = ?step.next_run,
            "sweep finished"
        );
        step
    }
}

fn eligible(line: &Line) -> Decision {
    if line.is_runnable() {
        Decision::Run
    } else {
        Decision::Complete
    }
}
