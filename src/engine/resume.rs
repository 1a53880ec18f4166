// src/engine/resume.rs

//! What to do with a checkpoint left by an earlier attempt.

use tracing::{info, warn};

use crate::dag::state_manager::{self, StateManager};
use crate::engine::operator::Operator;
use crate::errors::{ExectrError, Result};
use crate::script::{Line, Script};
use crate::types::{ExecutionMode, ResumeChoice};

#[derive(Debug, Clone, PartialEq)]
pub enum ResumeDecision {
    /// Run with these line states.
    Start(Vec<Line>),
    /// Do not run at all.
    Abort(String),
}

/// Decide how to start given the `previous` checkpoint, if any.
///
/// `forced` is the choice given on the command line; it replaces the first
/// prompt only.
pub fn resolve(
    script: &Script,
    previous: Option<Vec<Line>>,
    mode: ExecutionMode,
    mut forced: Option<ResumeChoice>,
    operator: &mut dyn Operator,
) -> Result<ResumeDecision> {
    let Some(mut previous) = previous else {
        if forced == Some(ResumeChoice::Continue) {
            warn!("--continue given but no previous execution was found; starting fresh");
        }
        return Ok(ResumeDecision::Start(script.fresh_lines()));
    };

    if let Some(difference) = script.shape_mismatch(&previous) {
        if mode.is_distributed() {
            return Err(ExectrError::ScriptDriftError(difference));
        }
        if matches!(
            forced,
            Some(ResumeChoice::RerunFailed | ResumeChoice::RerunAll)
        ) {
            info!(%difference, "script changed since the checkpoint; forcing a fresh run");
            return Ok(ResumeDecision::Start(script.fresh_lines()));
        }
        return if operator.confirm_fresh_run(&difference)? {
            Ok(ResumeDecision::Start(script.fresh_lines()))
        } else {
            Ok(ResumeDecision::Abort(
                "script changed since the checkpoint".to_string(),
            ))
        };
    }

    let mut live_claim = None;
    if let Some(stale) = state_manager::first_executing(&previous) {
        if !mode.is_distributed() {
            if forced == Some(ResumeChoice::RerunAll) {
                info!(line = stale.index, "discarding checkpoint with an executing line");
                return Ok(ResumeDecision::Start(script.fresh_lines()));
            }
            return Err(ExectrError::StaleStateError {
                line: stale.index,
                text: stale.original_text.clone(),
            });
        }
        live_claim = Some(stale.index);
        if forced.is_none() {
            info!(line = stale.index, "joining a distributed run in progress");
            forced = Some(ResumeChoice::Continue);
        }
    }

    let all_succeeded = state_manager::all_succeeded(&previous);

    loop {
        let choice = match forced.take() {
            Some(choice) => choice,
            None => operator.choose_resume(all_succeeded)?,
        };
        info!(%choice, "resume choice");

        match choice {
            ResumeChoice::Continue if all_succeeded => {
                return Ok(ResumeDecision::Abort(
                    "requested to continue, but the previous execution completed successfully"
                        .to_string(),
                ));
            }
            ResumeChoice::Continue => return Ok(ResumeDecision::Start(previous)),
            ResumeChoice::RerunFailed => {
                StateManager::new(&mut previous).reset_for_rerun();
                return Ok(ResumeDecision::Start(previous));
            }
            ResumeChoice::RerunAll => {
                // Starting over would drop another worker's claim.
                if let Some(line) = live_claim {
                    return Err(ExectrError::CoordinationError(format!(
                        "line {line} is still executing under another worker; \
                         cannot rerun all while the distributed run is live"
                    )));
                }
                return Ok(ResumeDecision::Start(script.fresh_lines()));
            }
            ResumeChoice::Display => operator.display(&previous),
            ResumeChoice::Abort => {
                return Ok(ResumeDecision::Abort("aborted by operator".to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::WorkerIdentity;
    use crate::script::{SkipReason, Status};
    use chrono::Utc;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Answers {
        choices: VecDeque<ResumeChoice>,
        fresh: bool,
        displayed: usize,
        asked: usize,
    }

    impl Operator for Answers {
        fn choose_resume(&mut self, _all_succeeded: bool) -> Result<ResumeChoice> {
            self.asked += 1;
            Ok(self.choices.pop_front().unwrap_or(ResumeChoice::Abort))
        }
        fn confirm_fresh_run(&mut self, _difference: &str) -> Result<bool> {
            self.asked += 1;
            Ok(self.fresh)
        }
        fn confirm_line(&mut self, _line: &Line) -> Result<bool> {
            Ok(true)
        }
        fn display(&mut self, _lines: &[Line]) {
            self.displayed += 1;
        }
    }

    const TEXT: &str = "echo a\necho b\necho c";

    fn script() -> Script {
        Script::parse("s.sh", TEXT).unwrap()
    }

    fn partially_run() -> Vec<Line> {
        let worker = WorkerIdentity::current();
        let mut lines = script().fresh_lines();
        let mut mgr = StateManager::new(&mut lines);
        mgr.claim(1, &worker, Utc::now());
        mgr.complete(1, 0, "a\n".into(), Utc::now());
        mgr.claim(2, &worker, Utc::now());
        mgr.complete(2, 1, String::new(), Utc::now());
        mgr.skip(3, SkipReason::Operator, Utc::now());
        lines
    }

    fn started(decision: ResumeDecision) -> Vec<Line> {
        match decision {
            ResumeDecision::Start(lines) => lines,
            ResumeDecision::Abort(msg) => panic!("unexpected abort: {msg}"),
        }
    }

    #[test]
    fn no_checkpoint_starts_fresh_without_asking() {
        let mut op = Answers::default();
        let lines = started(
            resolve(&script(), None, ExecutionMode::Single, Some(ResumeChoice::Continue), &mut op)
                .unwrap(),
        );
        assert_eq!(lines, script().fresh_lines());
        assert_eq!(op.asked, 0);
    }

    #[test]
    fn rerun_failed_keeps_succeeded_lines() {
        let mut op = Answers::default();
        op.choices.push_back(ResumeChoice::RerunFailed);
        let lines = started(
            resolve(&script(), Some(partially_run()), ExecutionMode::Single, None, &mut op)
                .unwrap(),
        );
        assert_eq!(lines[0].status, Status::Succeeded);
        assert_eq!(lines[0].output.as_deref(), Some("a\n"));
        assert_eq!(lines[1].status, Status::Untreated);
        assert_eq!(lines[2].status, Status::Untreated);
    }

    #[test]
    fn display_then_asks_again() {
        let mut op = Answers::default();
        op.choices.extend([ResumeChoice::Display, ResumeChoice::Continue]);
        let lines = started(
            resolve(&script(), Some(partially_run()), ExecutionMode::Single, None, &mut op)
                .unwrap(),
        );
        assert_eq!(op.displayed, 1);
        assert_eq!(op.asked, 2);
        assert_eq!(lines[1].status, Status::Failed);
    }

    #[test]
    fn continue_after_full_success_aborts() {
        let worker = WorkerIdentity::current();
        let mut done = script().fresh_lines();
        let mut mgr = StateManager::new(&mut done);
        for i in 1..=3 {
            mgr.claim(i, &worker, Utc::now());
            mgr.complete(i, 0, String::new(), Utc::now());
        }

        let mut op = Answers::default();
        let decision = resolve(
            &script(),
            Some(done),
            ExecutionMode::Single,
            Some(ResumeChoice::Continue),
            &mut op,
        )
        .unwrap();
        assert!(matches!(decision, ResumeDecision::Abort(_)));
    }

    #[test]
    fn drift_is_fatal_when_distributed() {
        let edited = Script::parse("s.sh", "echo a\necho B\necho c").unwrap();
        let mut op = Answers::default();
        let err = resolve(
            &edited,
            Some(partially_run()),
            ExecutionMode::Distributed,
            None,
            &mut op,
        )
        .unwrap_err();
        assert!(matches!(err, ExectrError::ScriptDriftError(_)));
    }

    #[test]
    fn drift_asks_in_single_mode_unless_rerun_is_forced() {
        let edited = Script::parse("s.sh", "echo a\necho B\necho c").unwrap();

        let mut op = Answers::default();
        let decision =
            resolve(&edited, Some(partially_run()), ExecutionMode::Single, None, &mut op).unwrap();
        assert!(matches!(decision, ResumeDecision::Abort(_)));
        assert_eq!(op.asked, 1);

        let mut op = Answers::default();
        let lines = started(
            resolve(
                &edited,
                Some(partially_run()),
                ExecutionMode::Single,
                Some(ResumeChoice::RerunFailed),
                &mut op,
            )
            .unwrap(),
        );
        assert_eq!(lines, edited.fresh_lines());
        assert_eq!(op.asked, 0);
    }

    #[test]
    fn executing_line_is_stale_in_single_mode_only() {
        let mut previous = partially_run();
        previous[2].clear_execution();
        StateManager::new(&mut previous).claim(3, &WorkerIdentity::new(9, Utc::now()), Utc::now());

        let mut op = Answers::default();
        let err = resolve(&script(), Some(previous.clone()), ExecutionMode::Single, None, &mut op)
            .unwrap_err();
        assert!(matches!(err, ExectrError::StaleStateError { line: 3, .. }));

        let lines = started(
            resolve(&script(), Some(previous.clone()), ExecutionMode::Distributed, None, &mut op)
                .unwrap(),
        );
        assert_eq!(lines, previous);
        assert_eq!(op.asked, 0);
    }
}
