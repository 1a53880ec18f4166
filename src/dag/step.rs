// src/dag/step.rs

//! Per-line decisions and sweep results.

use crate::script::{LineIndex, SkipReason};

/// What the scheduler wants to happen to one line right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Claim the line and hand its command to the runner.
    Run,
    /// Eligible, but there is no command to run (blank, placeholder or
    /// comment); it completes immediately.
    Complete,
    /// A dependency did not succeed.
    Skip(SkipReason),
    /// A dependency is still pending or running elsewhere.
    Defer,
    /// Already terminal, owned by another worker, or an always line this
    /// session already ran.
    Untouched,
}

/// Structured result of one sweep.
///
/// The sweep stops at the first line to run; lines after it are looked at
/// again in the next sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStep {
    /// Lines transitioned to `Skipped` during this sweep.
    pub newly_skipped: Vec<LineIndex>,
    /// Non-runnable lines completed during this sweep.
    pub newly_completed: Vec<LineIndex>,
    /// Lines left waiting on a dependency.
    pub deferred: Vec<LineIndex>,
    /// The line to run next, if any.
    pub next_run: Option<LineIndex>,
}

impl SweepStep {
    /// Whether the sweep changed any line state by itself.
    pub fn made_progress(&self) -> bool {
        !self.newly_skipped.is_empty() || !self.newly_completed.is_empty()
    }
}
