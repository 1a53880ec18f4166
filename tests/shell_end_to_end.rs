// tests/shell_end_to_end.rs
#![cfg(unix)]

mod common;
use crate::common::init_tracing;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use exectr::coord::WorkerIdentity;
use exectr::engine::{self, EngineOptions, RunOutcome};
use exectr::exec::ShellSession;
use exectr::fs::{FileSystem, RealFileSystem};
use exectr::script::{Script, SkipReason, Status};
use exectr_test_utils::{ScriptBuilder, ScriptedOperator};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn runs_a_real_script_in_one_shell() -> TestResult {
    init_tracing();
    if !Path::new("/bin/bash").exists() {
        return Ok(());
    }

    let dir = tempdir()?;
    let path = dir.path().join("deploy.sh");
    let text = ScriptBuilder::new()
        .always()
        .line("export GREETING=hello")
        .line("echo \"$GREETING $1\"")
        .line("false")
        .after("4")
        .line("echo never")
        .line("echo multi \\")
        .line("line")
        .text();
    std::fs::write(&path, text)?;

    let fs = RealFileSystem;
    let script = Script::load(&fs, &path)?;
    let args = vec!["world".to_string()];
    let mut session = ShellSession::spawn("/bin/bash", &args, Duration::from_secs(5)).await?;

    let report = engine::run_script(
        script,
        Arc::new(fs.clone()),
        &mut session,
        ScriptedOperator::new().boxed(),
        WorkerIdentity::current(),
        EngineOptions::default(),
    )
    .await?;
    session.close().await?;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.lines[2].output.as_deref(), Some("hello world\n"));
    assert_eq!(report.status_of(4), Some(Status::Failed));
    assert_eq!(report.lines[3].retcode, Some(1));
    assert_eq!(
        report.status_of(6),
        Some(Status::Skipped(SkipReason::DependencyFailed(4)))
    );
    assert_eq!(report.lines[6].output.as_deref(), Some("multi line\n"));
    assert_eq!(report.status_of(8), Some(Status::Succeeded));
    assert_eq!(report.exit_code(), 1);

    let mut checkpoint = path.as_os_str().to_owned();
    checkpoint.push(".exectr");
    assert!(fs.exists(Path::new(&checkpoint)));
    let mut log = checkpoint.clone();
    log.push(".log");
    assert!(fs.read_to_string(Path::new(&log))?.contains("hello world"));
    Ok(())
}

#[tokio::test]
async fn stderr_is_captured_with_stdout() -> TestResult {
    init_tracing();
    if !Path::new("/bin/bash").exists() {
        return Ok(());
    }

    let dir = tempdir()?;
    let path = dir.path().join("warn.sh");
    std::fs::write(
        &path,
        "echo out; echo err >&2; exit_code=3; (exit $exit_code)\nread answer\necho done\n",
    )?;

    let fs = RealFileSystem;
    let script = Script::load(&fs, &path)?;
    let session = ShellSession::spawn("/bin/bash", &[], Duration::from_secs(5)).await?;

    let report = engine::run_script(
        script,
        Arc::new(fs),
        session,
        ScriptedOperator::new().boxed(),
        WorkerIdentity::current(),
        EngineOptions::default(),
    )
    .await?;

    assert_eq!(report.lines[0].output.as_deref(), Some("out\nerr\n"));
    assert_eq!(report.lines[0].retcode, Some(3));
    // No stdin for script lines: `read` sees EOF instead of the session's input.
    assert_eq!(report.lines[1].retcode, Some(1));
    assert_eq!(report.lines[2].output.as_deref(), Some("done\n"));
    Ok(())
}
