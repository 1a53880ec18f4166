// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ExectrError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ExectrError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.engine, raw.paths))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_shell(cfg)?;
    validate_intervals(cfg)?;
    Ok(())
}

fn validate_shell(cfg: &RawConfigFile) -> Result<()> {
    if cfg.engine.shell.trim().is_empty() {
        return Err(ExectrError::ConfigError(
            "[engine].shell must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_intervals(cfg: &RawConfigFile) -> Result<()> {
    let e = &cfg.engine;
    let checks = [
        ("lock_poll_interval_ms", Some(e.lock_poll_interval_ms)),
        ("sweep_wait_ms", Some(e.sweep_wait_ms)),
        ("exit_probe_timeout_ms", Some(e.exit_probe_timeout_ms)),
        ("lock_timeout_secs", e.lock_timeout_secs),
        ("max_idle_sweeps", e.max_idle_sweeps.map(u64::from)),
    ];

    for (key, value) in checks {
        if value == Some(0) {
            return Err(ExectrError::ConfigError(format!(
                "[engine].{key} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}
