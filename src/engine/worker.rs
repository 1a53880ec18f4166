// src/engine/worker.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::checkpoint::{CheckpointStore, LogScope, LogWriter, StatePaths};
use crate::coord::{CoordinationLock, WorkerIdentity};
use crate::dag::state_manager::{self, StateManager};
use crate::dag::Scheduler;
use crate::engine::operator::Operator;
use crate::engine::report::{RunOutcome, RunReport};
use crate::engine::resume::{self, ResumeDecision};
use crate::engine::sync::StateSync;
use crate::engine::EngineOptions;
use crate::errors::Result;
use crate::exec::CommandRunner;
use crate::fs::FileSystem;
use crate::script::{AlwaysMode, Line, LineIndex, Script, SkipReason, Status};

/// One worker: sweeps the script, claims lines, runs them and records the
/// results until nothing is left for it to do.
///
/// The scheduling rules are pure ([`Scheduler`]); this struct is the async IO
/// shell around them: checkpoint sync, the command runner and the operator.
pub struct Worker<R: CommandRunner> {
    script: Script,
    scheduler: Scheduler,
    sync: StateSync,
    runner: R,
    operator: Box<dyn Operator>,
    identity: WorkerIdentity,
    options: EngineOptions,
    lines: Vec<Line>,
    /// Always lines this worker's session has already run.
    session_ran: HashSet<LineIndex>,
    executed: Vec<LineIndex>,
}

impl<R: CommandRunner> fmt::Debug for Worker<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("script", &self.script.path())
            .field("identity", &self.identity)
            .field("mode", &self.options.mode)
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> Worker<R> {
    pub fn new(
        script: Script,
        fs: Arc<dyn FileSystem>,
        runner: R,
        operator: Box<dyn Operator>,
        identity: WorkerIdentity,
        options: EngineOptions,
    ) -> Self {
        let paths = StatePaths::for_script(script.path(), options.state_dir.as_deref());
        let store = CheckpointStore::new(fs.clone(), paths.clone());

        let sync = if options.mode.is_distributed() {
            StateSync::Shared {
                store,
                log: LogWriter::new(
                    fs.clone(),
                    paths.worker_log(&identity),
                    LogScope::Worker(identity.clone()),
                ),
                lock: CoordinationLock::new(
                    fs,
                    paths.lock(),
                    identity.clone(),
                    options.lock_poll_interval,
                ),
                lock_timeout: options.lock_timeout,
            }
        } else {
            StateSync::Local {
                store,
                log: LogWriter::new(fs, paths.log(), LogScope::AllLines),
                every_line: options.checkpoint_every_line,
            }
        };

        Self {
            scheduler: Scheduler::new(&script),
            script,
            sync,
            runner,
            operator,
            identity,
            options,
            lines: Vec::new(),
            session_ran: HashSet::new(),
            executed: Vec::new(),
        }
    }

    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// Run until completion, a stall, or an aborting always line.
    ///
    /// On error the checkpoint is flushed (single mode) and a held lock is
    /// released before the error is returned.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(
            script = %self.script.path().display(),
            worker = %self.identity,
            mode = ?self.options.mode,
            lines = self.script.len(),
            "worker starting"
        );

        match self.run_inner().await {
            Ok(report) => {
                info!(worker = %self.identity, outcome = ?report.outcome, "worker finished");
                Ok(report)
            }
            Err(err) => {
                warn!(worker = %self.identity, error = %err, "worker stopping on error");
                self.sync.abandon(&self.script, &self.lines);
                Err(err)
            }
        }
    }

    async fn run_inner(&mut self) -> Result<RunReport> {
        match self.prepare().await? {
            ResumeDecision::Start(lines) => self.lines = lines,
            ResumeDecision::Abort(reason) => {
                info!(%reason, "not running script");
                return Ok(RunReport::not_started(reason));
            }
        }

        let outcome = self.execute_lines().await?;
        self.sync.finish(&self.script, &self.lines).await?;

        Ok(RunReport {
            outcome,
            lines: self.lines.clone(),
            executed: std::mem::take(&mut self.executed),
        })
    }

    /// Resume policy, under the lock in distributed mode.
    async fn prepare(&mut self) -> Result<ResumeDecision> {
        self.sync.lock().await?;

        let decided = self.sync.store().load().and_then(|previous| {
            resume::resolve(
                &self.script,
                previous,
                self.options.mode,
                self.options.forced_choice,
                self.operator.as_mut(),
            )
        });

        match decided {
            Ok(ResumeDecision::Start(lines)) => {
                self.sync.publish(&self.script, &lines).await?;
                Ok(ResumeDecision::Start(lines))
            }
            Ok(abort) => {
                self.sync.unlock()?;
                Ok(abort)
            }
            Err(err) => Err(err),
        }
    }

    async fn execute_lines(&mut self) -> Result<RunOutcome> {
        let mut idle_sweeps: u32 = 0;
        let mut last_seen: Option<Vec<Status>> = None;

        loop {
            self.sync.begin(&self.script, &mut self.lines).await?;
            let step =
                self.scheduler
                    .sweep(&mut self.lines, &mut self.session_ran, &self.identity);

            let Some(index) = step.next_run else {
                self.sync
                    .commit(&self.script, &self.lines, step.made_progress(), false)
                    .await?;

                if state_manager::all_terminal(&self.lines) {
                    return Ok(RunOutcome::Completed);
                }
                if step.made_progress() {
                    continue;
                }
                if !self.options.mode.is_distributed() {
                    return Ok(self.stalled());
                }

                let seen: Vec<Status> = self.lines.iter().map(|l| l.status).collect();
                if last_seen.as_ref() == Some(&seen) {
                    idle_sweeps += 1;
                } else {
                    idle_sweeps = 0;
                }
                last_seen = Some(seen);

                if let Some(max) = self.options.max_idle_sweeps {
                    if idle_sweeps >= max {
                        warn!(idle_sweeps, "no progress; giving up");
                        return Ok(self.stalled());
                    }
                }

                debug!(
                    deferred = ?step.deferred,
                    idle_sweeps,
                    "nothing runnable; waiting for other workers"
                );
                tokio::time::sleep(self.options.sweep_wait).await;
                continue;
            };

            idle_sweeps = 0;
            last_seen = None;

            StateManager::new(&mut self.lines).claim(index, &self.identity, Utc::now());
            if self.lines[index - 1].always.is_always() {
                self.session_ran.insert(index);
            }
            self.sync.commit(&self.script, &self.lines, true, true).await?;

            self.execute_line(index).await?;
            self.sync.merge(&self.script, &mut self.lines, index).await?;

            let line = &self.lines[index - 1];
            if line.always == AlwaysMode::Always && line.status != Status::Succeeded {
                warn!(line = index, status = %line.status, "always-required command failed; aborting");
                return Ok(RunOutcome::AbortedByAlways { line: index });
            }
        }
    }

    /// Prompt (interactive mode) and run one claimed line, recording the
    /// result in memory.
    async fn execute_line(&mut self, index: LineIndex) -> Result<()> {
        let line = self.lines[index - 1].clone();

        if self.options.interactive {
            self.operator.display(&self.lines);
            if !self.operator.confirm_line(&line)? {
                StateManager::new(&mut self.lines).skip(index, SkipReason::Operator, Utc::now());
                info!(line = index, "skipped by operator");
                return Ok(());
            }
        }

        let command = line.command.as_deref().unwrap_or_default();
        info!(line = index, worker = %self.identity, command, "executing line");
        self.executed.push(index);

        let (exit_code, output) = match self.runner.run(command).await {
            Ok(out) => (out.exit_code, out.output),
            Err(err) => {
                warn!(line = index, error = %format!("{err:#}"), "command runner failed");
                (-1, format!("{err:#}\n"))
            }
        };

        if exit_code == 0 {
            info!(line = index, "line succeeded");
        } else {
            warn!(line = index, exit_code, "line failed");
        }
        StateManager::new(&mut self.lines).complete(index, exit_code, output, Utc::now());
        Ok(())
    }

    fn stalled(&self) -> RunOutcome {
        RunOutcome::Stalled {
            blocked: state_manager::unfinished(&self.lines),
        }
    }
}
