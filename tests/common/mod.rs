#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use exectr::coord::WorkerIdentity;
use exectr::engine::{self, EngineOptions, RunReport};
use exectr::errors::Result;
use exectr::fs::MockFileSystem;
use exectr::script::Script;
use exectr::types::{ExecutionMode, ResumeChoice};
use exectr_test_utils::{FakeRunner, ScriptedOperator};

pub use exectr_test_utils::init_tracing;

pub const SCRIPT: &str = "/work/deploy.sh";
pub const CHECKPOINT: &str = "/work/deploy.sh.exectr";
pub const LOG: &str = "/work/deploy.sh.exectr.log";
pub const LOCK: &str = "/work/deploy.sh.exectr.lock";

/// Fast polling so tests don't sleep for long.
pub fn options(mode: ExecutionMode, forced: Option<ResumeChoice>) -> EngineOptions {
    EngineOptions {
        mode,
        forced_choice: forced,
        lock_poll_interval: Duration::from_millis(2),
        lock_timeout: Some(Duration::from_secs(5)),
        sweep_wait: Duration::from_millis(5),
        ..EngineOptions::default()
    }
}

pub fn worker(pid: u32) -> WorkerIdentity {
    WorkerIdentity::new(pid, Utc::now())
}

pub async fn run(
    fs: &MockFileSystem,
    script: Script,
    runner: &FakeRunner,
    operator: &ScriptedOperator,
    options: EngineOptions,
) -> Result<RunReport> {
    engine::run_script(
        script,
        Arc::new(fs.clone()),
        runner.clone(),
        operator.boxed(),
        worker(1),
        options,
    )
    .await
}
