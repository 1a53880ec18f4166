// src/engine/mod.rs

//! Execution engine for exectr.
//!
//! This module ties together:
//! - the resume policy run once at startup ([`resume`])
//! - operator interaction ([`operator`])
//! - checkpoint synchronisation for single and distributed mode ([`sync`])
//! - the sweep/claim/run/merge loop of one worker ([`worker`])
//! - the final summary ([`report`])
//!
//! Scheduling decisions themselves are pure and live in [`crate::dag`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigFile;
use crate::coord::WorkerIdentity;
use crate::errors::Result;
use crate::exec::CommandRunner;
use crate::fs::FileSystem;
use crate::script::Script;
use crate::types::{ExecutionMode, ResumeChoice};

pub mod operator;
pub mod report;
pub mod resume;
pub mod sync;
pub mod worker;

pub use operator::{Operator, TerminalOperator};
pub use report::{RunOutcome, RunReport};
pub use resume::ResumeDecision;
pub use sync::StateSync;
pub use worker::Worker;

/// Everything that tunes a run, merged from config file and CLI.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub mode: ExecutionMode,
    /// Ask the operator before every line.
    pub interactive: bool,
    /// Resume choice given on the command line instead of asking.
    pub forced_choice: Option<ResumeChoice>,
    pub shell: String,
    /// Positional parameters for the script (`$1`, `$2`, ...).
    pub script_args: Vec<String>,
    pub lock_poll_interval: Duration,
    pub lock_timeout: Option<Duration>,
    pub sweep_wait: Duration,
    pub max_idle_sweeps: Option<u32>,
    pub exit_probe_timeout: Duration,
    pub checkpoint_every_line: bool,
    pub state_dir: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&ConfigFile::default())
    }
}

impl EngineOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let e = &cfg.engine;
        Self {
            mode: ExecutionMode::Single,
            interactive: false,
            forced_choice: None,
            shell: e.shell.clone(),
            script_args: Vec::new(),
            lock_poll_interval: Duration::from_millis(e.lock_poll_interval_ms),
            lock_timeout: e.lock_timeout_secs.map(Duration::from_secs),
            sweep_wait: Duration::from_millis(e.sweep_wait_ms),
            max_idle_sweeps: e.max_idle_sweeps,
            exit_probe_timeout: Duration::from_millis(e.exit_probe_timeout_ms),
            checkpoint_every_line: e.checkpoint_every_line,
            state_dir: cfg.paths.state_dir.clone(),
        }
    }
}

/// Run `script` to the end with one worker and return its report.
pub async fn run_script<R: CommandRunner>(
    script: Script,
    fs: Arc<dyn FileSystem>,
    runner: R,
    operator: Box<dyn Operator>,
    identity: WorkerIdentity,
    options: EngineOptions,
) -> Result<RunReport> {
    Worker::new(script, fs, runner, operator, identity, options)
        .run()
        .await
}
