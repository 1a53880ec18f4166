// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::ConfigFile;
use crate::engine::EngineOptions;
use crate::types::{ExecutionMode, ResumeChoice};

/// Command-line arguments for `exectr`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "exectr",
    version,
    about = "Execute a shell script line by line with resumable, dependency-aware state.",
    long_about = None
)]
pub struct CliArgs {
    /// Script to execute.
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Arguments passed to the script as `$1`, `$2`, ...
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Exectr.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXECTR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Cooperate with other workers running the same script.
    #[arg(short, long)]
    pub distributed: bool,

    /// Ask before executing each line.
    #[arg(short, long)]
    pub interactive: bool,

    /// Resume the previous execution without asking.
    #[arg(long = "continue", conflicts_with_all = ["rerun", "rerun_all"])]
    pub resume: bool,

    /// Re-run failed and skipped lines of the previous execution without asking.
    #[arg(long, conflicts_with = "rerun_all")]
    pub rerun: bool,

    /// Discard the previous execution and start over.
    #[arg(long)]
    pub rerun_all: bool,

    /// Parse and validate, print the lines, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Give up waiting for the coordination lock after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub lock_timeout: Option<u64>,

    /// Stop a distributed worker after this many sweeps without progress.
    #[arg(long, value_name = "N")]
    pub max_idle_sweeps: Option<u32>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    pub fn forced_choice(&self) -> Option<ResumeChoice> {
        if self.resume {
            Some(ResumeChoice::Continue)
        } else if self.rerun {
            Some(ResumeChoice::RerunFailed)
        } else if self.rerun_all {
            Some(ResumeChoice::RerunAll)
        } else {
            None
        }
    }

    /// Merge the command line over the config file.
    pub fn engine_options(&self, cfg: &ConfigFile) -> EngineOptions {
        let mut options = EngineOptions::from_config(cfg);
        options.mode = if self.distributed {
            ExecutionMode::Distributed
        } else {
            ExecutionMode::Single
        };
        options.interactive = self.interactive;
        options.forced_choice = self.forced_choice();
        options.script_args = self.args.clone();
        if let Some(secs) = self.lock_timeout {
            options.lock_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(n) = self.max_idle_sweeps {
            options.max_idle_sweeps = Some(n);
        }
        options
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
