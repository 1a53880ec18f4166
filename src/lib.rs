// src/lib.rs

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod coord;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod script;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_optional;
use crate::coord::WorkerIdentity;
use crate::dag::DependencyGraph;
use crate::engine::{EngineOptions, TerminalOperator};
use crate::errors::ExectrError;
use crate::exec::ShellSession;
use crate::fs::{FileSystem, RealFileSystem};
use crate::script::Script;

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading
/// - script parsing (all load-time errors surface here)
/// - the shell session
/// - one worker running to the end
pub async fn run(args: CliArgs) -> Result<i32> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let cfg = load_optional(fs.as_ref(), args.config.as_deref())?;
    let options = args.engine_options(&cfg);

    let path = fs.canonicalize(&args.script).map_err(|e| {
        ExectrError::ParseError(format!("{}: {e:#}", args.script.display()))
    })?;
    let script = Script::load(fs.as_ref(), &path)?;

    if args.dry_run {
        print_dry_run(&script, &options);
        return Ok(0);
    }

    println!(
        "Going to EXECUTE script {} {}",
        path.display(),
        options.script_args.join(" ")
    );

    let mut runner = ShellSession::spawn(
        &options.shell,
        &options.script_args,
        options.exit_probe_timeout,
    )
    .await?;

    let result = engine::run_script(
        script,
        fs,
        &mut runner,
        Box::new(TerminalOperator::new()),
        WorkerIdentity::current(),
        options,
    )
    .await;
    if let Err(e) = runner.close().await {
        warn!(error = %format!("{e:#}"), "shell session did not close cleanly");
    }
    let report = result?;

    if !report.lines.is_empty() {
        println!();
        print!("{}", report.render());
    }
    println!();
    println!("{report}");

    Ok(report.exit_code())
}

/// Print every line with its dependencies, dependents, tag and mode.
fn print_dry_run(script: &Script, options: &EngineOptions) {
    let graph = DependencyGraph::from_lines(script.lines());

    println!("exectr dry-run: {}", script.path().display());
    println!("  mode = {:?}", options.mode);
    println!("  shell = {}", options.shell);
    if !options.script_args.is_empty() {
        println!("  args = {:?}", options.script_args);
    }
    println!();

    println!("lines ({}):", script.len());
    for line in script.lines() {
        let marker = if line.is_runnable() { "*" } else { " " };
        println!("  {marker} {:>3} {}", line.index, line.original_text);
        if let Some(ref tag) = line.tag {
            println!("          tag: {tag}");
        }
        if line.always.is_always() {
            println!("          always: {}", line.always);
        }
        let deps = graph.dependencies_of(line.index);
        if !deps.is_empty() {
            println!("          after: {deps:?}");
        }
        let dependents = graph.dependents_of(line.index);
        if !dependents.is_empty() {
            println!("          needed by: {dependents:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}
