// src/checkpoint/store.rs

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::checkpoint::paths::StatePaths;
use crate::checkpoint::schema::{self, CheckpointFile, LineRecord, SCHEMA_VERSION};
use crate::errors::{ExectrError, Result};
use crate::fs::FileSystem;
use crate::script::{Line, Script, Status};

/// Durable snapshot of every line's state for one script.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    fs: Arc<dyn FileSystem>,
    paths: StatePaths,
}

impl CheckpointStore {
    pub fn new(fs: Arc<dyn FileSystem>, paths: StatePaths) -> Self {
        Self { fs, paths }
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    /// Load the checkpoint, or `None` if there is none yet.
    pub fn load(&self) -> Result<Option<Vec<Line>>> {
        let path = self.paths.checkpoint();
        if !self.fs.exists(&path) {
            return Ok(None);
        }

        let text = self.fs.read_to_string(&path)?;
        let file = schema::decode(&text)?;
        let lines = file
            .lines
            .into_iter()
            .map(Line::try_from)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            checkpoint = %path.display(),
            lines = lines.len(),
            saved_at = %file.saved_at,
            "checkpoint loaded"
        );
        Ok(Some(lines))
    }

    /// Load the checkpoint and insist it belongs to `script` as parsed now.
    ///
    /// Used when re-reading state mid-run: a missing checkpoint or one that
    /// no longer matches the script means another party replaced it.
    pub fn load_matching(&self, script: &Script) -> Result<Vec<Line>> {
        let lines = self.load()?.ok_or_else(|| {
            ExectrError::CheckpointError(format!(
                "checkpoint {} disappeared during the run",
                self.paths.checkpoint().display()
            ))
        })?;
        if let Some(diff) = script.shape_mismatch(&lines) {
            return Err(ExectrError::ScriptDriftError(diff));
        }
        Ok(lines)
    }

    /// Overwrite the checkpoint with `lines`.
    ///
    /// With `demote_executing`, lines caught mid-execution are written as
    /// `Untreated` so that a crash leaves a resumable checkpoint behind. The
    /// in-memory lines are not touched.
    pub fn save(&self, script: &Script, lines: &[Line], demote_executing: bool) -> Result<()> {
        let records = lines
            .iter()
            .map(|line| {
                let mut record = LineRecord::from(line);
                if demote_executing && line.status == Status::Executing {
                    record.status = schema::StatusRecord::Untreated;
                }
                record
            })
            .collect();

        let file = CheckpointFile {
            schema_version: SCHEMA_VERSION,
            script_path: script.path().display().to_string(),
            script_hash: script.source_hash().to_string(),
            saved_at: Utc::now(),
            lines: records,
        };

        let path = self.paths.checkpoint();
        let existed = self.fs.exists(&path);
        self.fs.write(&path, schema::encode(&file)?.as_bytes())?;

        if existed {
            debug!(checkpoint = %path.display(), "checkpoint overwritten");
        } else {
            info!(checkpoint = %path.display(), "checkpoint created");
        }
        Ok(())
    }
}
