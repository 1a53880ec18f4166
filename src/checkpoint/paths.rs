// src/checkpoint/paths.rs

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::coord::WorkerIdentity;

const SUFFIX: &str = ".exectr";

/// On-disk locations of everything kept for one script.
///
/// By default files sit next to the script (`deploy.sh.exectr`,
/// `deploy.sh.exectr.log`, `deploy.sh.exectr.lock`). With a state directory
/// they move there, prefixed by a hash of the script path so that scripts with
/// the same file name in different directories do not collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    base: PathBuf,
}

impl StatePaths {
    pub fn for_script(script: &Path, state_dir: Option<&Path>) -> Self {
        let base = match state_dir {
            None => with_suffix(script.as_os_str().to_owned(), SUFFIX),
            Some(dir) => {
                let key = blake3::hash(script.as_os_str().as_encoded_bytes()).to_hex();
                let name = script
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "script".to_string());
                dir.join(format!("{}-{name}{SUFFIX}", &key.as_str()[..16]))
            }
        };
        Self { base }
    }

    pub fn checkpoint(&self) -> PathBuf {
        self.base.clone()
    }

    pub fn log(&self) -> PathBuf {
        with_suffix(self.base.as_os_str().to_owned(), ".log")
    }

    pub fn lock(&self) -> PathBuf {
        with_suffix(self.base.as_os_str().to_owned(), ".lock")
    }

    /// Log file for one distributed worker.
    pub fn worker_log(&self, worker: &WorkerIdentity) -> PathBuf {
        with_suffix(
            self.base.as_os_str().to_owned(),
            &format!(".{}.log", worker.file_token()),
        )
    }
}

fn with_suffix(mut path: OsString, suffix: &str) -> PathBuf {
    path.push(suffix);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn files_sit_next_to_the_script_by_default() {
        let paths = StatePaths::for_script(Path::new("/ops/deploy.sh"), None);
        assert_eq!(paths.checkpoint(), PathBuf::from("/ops/deploy.sh.exectr"));
        assert_eq!(paths.log(), PathBuf::from("/ops/deploy.sh.exectr.log"));
        assert_eq!(paths.lock(), PathBuf::from("/ops/deploy.sh.exectr.lock"));

        let worker = WorkerIdentity::new(7, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert_eq!(
            paths.worker_log(&worker),
            PathBuf::from("/ops/deploy.sh.exectr.7-1700000000000000.log")
        );
    }

    #[test]
    fn state_dir_keys_by_script_path() {
        let dir = Path::new("/var/lib/exectr");
        let a = StatePaths::for_script(Path::new("/a/deploy.sh"), Some(dir));
        let b = StatePaths::for_script(Path::new("/b/deploy.sh"), Some(dir));

        assert!(a.checkpoint().starts_with(dir));
        assert!(
            a.checkpoint()
                .to_string_lossy()
                .ends_with("-deploy.sh.exectr")
        );
        assert_ne!(a.checkpoint(), b.checkpoint());
    }
}
