// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ExectrError, Result};
use crate::fs::FileSystem;

/// Read and deserialize a configuration file without validating it.
pub fn load_from_path(fs: &dyn FileSystem, path: &Path) -> Result<RawConfigFile> {
    let contents = fs.read_to_string(path).map_err(|e| {
        ExectrError::ConfigError(format!("cannot read {}: {e:#}", path.display()))
    })?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

pub fn load_and_validate(fs: &dyn FileSystem, path: &Path) -> Result<ConfigFile> {
    let raw_config = load_from_path(fs, path)?;
    ConfigFile::try_from(raw_config)
}

/// Resolve the configuration to use.
///
/// An explicit path must exist. Without one, [`default_config_path`] is used
/// if present and built-in defaults otherwise.
pub fn load_optional(fs: &dyn FileSystem, explicit: Option<&Path>) -> Result<ConfigFile> {
    match explicit {
        Some(path) => load_and_validate(fs, path),
        None => {
            let path = default_config_path();
            if fs.exists(&path) {
                debug!(config = %path.display(), "using default config file");
                load_and_validate(fs, &path)
            } else {
                debug!("no config file; using defaults");
                Ok(ConfigFile::default())
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("Exectr.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn explicit_path_must_exist() {
        let fs = MockFileSystem::new();
        let err = load_optional(&fs, Some(Path::new("/etc/exectr.toml"))).unwrap_err();
        assert!(matches!(err, ExectrError::ConfigError(_)));
    }

    #[test]
    fn reads_explicit_file() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/etc/exectr.toml",
            "[engine]\nsweep_wait_ms = 50\nmax_idle_sweeps = 10\n[paths]\nstate_dir = \"/var/exectr\"\n",
        );
        let cfg = load_optional(&fs, Some(Path::new("/etc/exectr.toml"))).unwrap();
        assert_eq!(cfg.engine.sweep_wait_ms, 50);
        assert_eq!(cfg.engine.max_idle_sweeps, Some(10));
        assert_eq!(cfg.paths.state_dir, Some(PathBuf::from("/var/exectr")));
    }

    #[test]
    fn missing_default_file_means_defaults() {
        let fs = MockFileSystem::new();
        let cfg = load_optional(&fs, None).unwrap();
        assert_eq!(cfg.engine.sweep_wait_ms, 1000);
    }
}
