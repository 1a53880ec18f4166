// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// shell = "/bin/bash"
/// lock_poll_interval_ms = 200
/// lock_timeout_secs = 600
/// sweep_wait_ms = 1000
/// max_idle_sweeps = 3600
/// exit_probe_timeout_ms = 5000
/// checkpoint_every_line = true
///
/// [paths]
/// state_dir = ".exectr"
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub paths: PathsSection,
}

/// Validated configuration. Only built through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub engine: EngineSection,
    pub paths: PathsSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(engine: EngineSection, paths: PathsSection) -> Self {
        Self { engine, paths }
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Shell the commands run in.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// How often a waiting worker retries the coordination lock.
    #[serde(default = "default_lock_poll_interval_ms")]
    pub lock_poll_interval_ms: u64,

    /// Give up waiting for the lock after this long. Unset waits forever.
    #[serde(default)]
    pub lock_timeout_secs: Option<u64>,

    /// Pause between sweeps when a distributed worker has nothing to run.
    #[serde(default = "default_sweep_wait_ms")]
    pub sweep_wait_ms: u64,

    /// Stop after this many consecutive sweeps without progress. Unset polls
    /// forever.
    #[serde(default)]
    pub max_idle_sweeps: Option<u32>,

    #[serde(default = "default_exit_probe_timeout_ms")]
    pub exit_probe_timeout_ms: u64,

    /// Single-worker mode: save the checkpoint before every executed line,
    /// not only at the end.
    #[serde(default = "default_checkpoint_every_line")]
    pub checkpoint_every_line: bool,
}

fn default_shell() -> String {
    "/bin/bash".to_string()
}

fn default_lock_poll_interval_ms() -> u64 {
    200
}

fn default_sweep_wait_ms() -> u64 {
    1000
}

fn default_exit_probe_timeout_ms() -> u64 {
    5000
}

fn default_checkpoint_every_line() -> bool {
    true
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            lock_poll_interval_ms: default_lock_poll_interval_ms(),
            lock_timeout_secs: None,
            sweep_wait_ms: default_sweep_wait_ms(),
            max_idle_sweeps: None,
            exit_probe_timeout_ms: default_exit_probe_timeout_ms(),
            checkpoint_every_line: default_checkpoint_every_line(),
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    /// Keep checkpoints, logs and lock files here instead of next to the
    /// script.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}
