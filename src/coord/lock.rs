// src/coord/lock.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::coord::WorkerIdentity;
use crate::errors::{ExectrError, Result};
use crate::fs::FileSystem;

/// Lock-file based mutual exclusion between workers.
///
/// The marker file exists while the lock is held and contains the holder's
/// [`WorkerIdentity`]. There is no fairness and no stale-lock recovery: a
/// killed holder leaves the marker behind and an operator has to remove it.
#[derive(Debug)]
pub struct CoordinationLock {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    identity: WorkerIdentity,
    poll_interval: Duration,
    held: bool,
}

impl CoordinationLock {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        path: impl Into<PathBuf>,
        identity: WorkerIdentity,
        poll_interval: Duration,
    ) -> Self {
        Self {
            fs,
            path: path.into(),
            identity,
            poll_interval,
            held: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Wait until the marker is absent, then create it with our identity.
    ///
    /// `timeout = None` waits forever.
    pub async fn acquire(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.held {
            return Err(ExectrError::CoordinationError(format!(
                "worker {} already holds {}",
                self.identity,
                self.path.display()
            )));
        }

        let started = Instant::now();
        let marker = self.identity.to_string();

        loop {
            if self.fs.create_new(&self.path, marker.as_bytes())? {
                self.held = true;
                debug!(
                    lock = %self.path.display(),
                    worker = %self.identity,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "lock acquired"
                );
                return Ok(());
            }

            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    let holder = self
                        .fs
                        .read_to_string(&self.path)
                        .unwrap_or_else(|_| "<unknown>".to_string());
                    return Err(ExectrError::CoordinationError(format!(
                        "timed out after {:?} waiting for {} (held by {})",
                        limit,
                        self.path.display(),
                        holder.trim()
                    )));
                }
            }

            trace!(lock = %self.path.display(), "lock busy; polling");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Remove the marker if it records our identity.
    ///
    /// - marker absent: error when `strict`, no-op otherwise;
    /// - marker recording another identity: always an error, the marker is
    ///   left in place.
    pub fn release(&mut self, strict: bool) -> Result<()> {
        self.held = false;

        if !self.fs.exists(&self.path) {
            if strict {
                return Err(ExectrError::CoordinationError(format!(
                    "lock {} vanished while held by {}",
                    self.path.display(),
                    self.identity
                )));
            }
            return Ok(());
        }

        let recorded = self.fs.read_to_string(&self.path)?;
        let recorded = recorded.trim();
        if recorded != self.identity.to_string() {
            return Err(ExectrError::CoordinationError(format!(
                "lock {} is held by {recorded}, not by {} (lock was stolen)",
                self.path.display(),
                self.identity
            )));
        }

        self.fs.remove_file(&self.path)?;
        debug!(lock = %self.path.display(), worker = %self.identity, "lock released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use chrono::Utc;

    const LOCK: &str = "/work/script.sh.exectr.lock";

    fn lock_for(fs: &MockFileSystem, pid: u32) -> CoordinationLock {
        CoordinationLock::new(
            Arc::new(fs.clone()),
            LOCK,
            WorkerIdentity::new(pid, Utc::now()),
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn acquire_writes_identity_and_release_removes_it() {
        let fs = MockFileSystem::new();
        let mut lock = lock_for(&fs, 1);

        lock.acquire(None).await.unwrap();
        assert!(lock.is_held());
        let marker = fs.read_to_string(Path::new(LOCK)).unwrap();
        assert_eq!(marker, lock.identity.to_string());

        lock.release(true).unwrap();
        assert!(!fs.exists(Path::new(LOCK)));
    }

    #[tokio::test]
    async fn acquire_times_out_while_someone_else_holds_it() {
        let fs = MockFileSystem::new();
        let mut holder = lock_for(&fs, 1);
        let mut waiter = lock_for(&fs, 2);

        holder.acquire(None).await.unwrap();
        let err = waiter
            .acquire(Some(Duration::from_millis(30)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExectrError::CoordinationError(msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn waiter_gets_lock_after_release() {
        let fs = MockFileSystem::new();
        let mut holder = lock_for(&fs, 1);
        let mut waiter = lock_for(&fs, 2);

        holder.acquire(None).await.unwrap();
        let release = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            holder.release(true).unwrap();
        };
        let (_, acquired) = tokio::join!(release, waiter.acquire(Some(Duration::from_secs(2))));
        acquired.unwrap();
        assert!(waiter.is_held());
    }

    #[test]
    fn strict_release_of_missing_marker_fails() {
        let fs = MockFileSystem::new();
        let mut lock = lock_for(&fs, 1);

        assert!(matches!(
            lock.release(true),
            Err(ExectrError::CoordinationError(_))
        ));
        lock.release(false).unwrap();
    }

    #[test]
    fn release_of_foreign_marker_fails_and_keeps_it() {
        let fs = MockFileSystem::new();
        let other = WorkerIdentity::new(99, Utc::now());
        fs.add_file(LOCK, other.to_string());
        let mut lock = lock_for(&fs, 1);

        let err = lock.release(false).unwrap_err();
        assert!(matches!(err, ExectrError::CoordinationError(msg) if msg.contains("stolen")));
        assert_eq!(
            fs.read_to_string(Path::new(LOCK)).unwrap(),
            other.to_string()
        );
    }
}
