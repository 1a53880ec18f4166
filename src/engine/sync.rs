// src/engine/sync.rs

//! Keeping in-memory line state and the checkpoint in step.
//!
//! In single mode this worker is the only writer: memory is the truth and
//! the checkpoint is a crash snapshot. In distributed mode the checkpoint is
//! the truth: every cycle reloads it under the lock and writes back before
//! releasing.

use std::time::Duration;

use tracing::{debug, warn};

use crate::checkpoint::{CheckpointStore, LogWriter};
use crate::coord::CoordinationLock;
use crate::dag::StateManager;
use crate::errors::Result;
use crate::script::{Line, LineIndex, Script};

#[derive(Debug)]
pub enum StateSync {
    Local {
        store: CheckpointStore,
        log: LogWriter,
        every_line: bool,
    },
    Shared {
        store: CheckpointStore,
        log: LogWriter,
        lock: CoordinationLock,
        lock_timeout: Option<Duration>,
    },
}

impl StateSync {
    pub fn store(&self) -> &CheckpointStore {
        match self {
            StateSync::Local { store, .. } | StateSync::Shared { store, .. } => store,
        }
    }

    /// Take the lock for the startup read-decide-write (distributed only).
    pub async fn lock(&mut self) -> Result<()> {
        if let StateSync::Shared {
            lock, lock_timeout, ..
        } = self
        {
            lock.acquire(*lock_timeout).await?;
        }
        Ok(())
    }

    /// Publish the startup state and drop the startup lock.
    pub async fn publish(&mut self, script: &Script, lines: &[Line]) -> Result<()> {
        match self {
            StateSync::Local { .. } => Ok(()),
            StateSync::Shared { store, lock, .. } => {
                store.save(script, lines, false)?;
                lock.release(true)
            }
        }
    }

    /// Drop the startup lock without writing anything.
    pub fn unlock(&mut self) -> Result<()> {
        match self {
            StateSync::Local { .. } => Ok(()),
            StateSync::Shared { lock, .. } => lock.release(true),
        }
    }

    /// Start a cycle: make `lines` current.
    pub async fn begin(&mut self, script: &Script, lines: &mut Vec<Line>) -> Result<()> {
        match self {
            StateSync::Local { .. } => Ok(()),
            StateSync::Shared {
                store,
                lock,
                lock_timeout,
                ..
            } => {
                lock.acquire(*lock_timeout).await?;
                *lines = store.load_matching(script)?;
                Ok(())
            }
        }
    }

    /// End a cycle started with [`StateSync::begin`].
    ///
    /// `changed` tells whether the sweep or a claim modified `lines`;
    /// `claimed` whether a line is about to run.
    pub async fn commit(
        &mut self,
        script: &Script,
        lines: &[Line],
        changed: bool,
        claimed: bool,
    ) -> Result<()> {
        match self {
            StateSync::Local {
                store,
                log,
                every_line,
            } => {
                if claimed && *every_line {
                    store.save(script, lines, true)?;
                    log.write(lines)?;
                }
                Ok(())
            }
            StateSync::Shared {
                store, log, lock, ..
            } => {
                if changed {
                    store.save(script, lines, false)?;
                    log.write(lines)?;
                }
                lock.release(true)
            }
        }
    }

    /// Bring the result of line `index` (already recorded in `lines`) into the
    /// shared state.
    pub async fn merge(
        &mut self,
        script: &Script,
        lines: &mut Vec<Line>,
        index: LineIndex,
    ) -> Result<()> {
        match self {
            StateSync::Local { .. } => Ok(()),
            StateSync::Shared {
                store,
                log,
                lock,
                lock_timeout,
            } => {
                let Some(finished) = index.checked_sub(1).and_then(|i| lines.get(i)).cloned()
                else {
                    return Ok(());
                };

                lock.acquire(*lock_timeout).await?;
                let mut current = store.load_matching(script)?;
                StateManager::new(&mut current).apply_result(&finished);
                store.save(script, &current, false)?;
                log.write(&current)?;
                lock.release(true)?;

                debug!(line = index, "result merged into shared checkpoint");
                *lines = current;
                Ok(())
            }
        }
    }

    /// Final write at the end of a run.
    pub async fn finish(&mut self, script: &Script, lines: &[Line]) -> Result<()> {
        match self {
            StateSync::Local { store, log, .. } => {
                store.save(script, lines, true)?;
                log.write(lines)
            }
            StateSync::Shared { log, .. } => log.write(lines),
        }
    }

    /// Best effort cleanup after a fatal error: keep what single mode knows,
    /// never leave our lock behind.
    pub fn abandon(&mut self, script: &Script, lines: &[Line]) {
        match self {
            StateSync::Local { store, log, .. } => {
                if lines.is_empty() {
                    return;
                }
                if let Err(e) = store.save(script, lines, true) {
                    warn!(error = %e, "could not save checkpoint after error");
                }
                if let Err(e) = log.write(lines) {
                    warn!(error = %e, "could not write log after error");
                }
            }
            StateSync::Shared { lock, .. } => {
                if lock.is_held() {
                    if let Err(e) = lock.release(false) {
                        warn!(error = %e, "could not release lock after error");
                    }
                }
            }
        }
    }
}
