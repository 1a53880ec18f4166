// src/checkpoint/log.rs

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tracing::debug;

use crate::coord::WorkerIdentity;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::script::Line;

/// Which lines' output a [`LogWriter`] collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogScope {
    /// Every line that produced output.
    AllLines,
    /// Lines whose most recent executor is this worker.
    Worker(WorkerIdentity),
}

/// Rewrites the output log from the current line states.
///
/// The log is a plain join of captured outputs followed by a timestamp line.
#[derive(Debug, Clone)]
pub struct LogWriter {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    scope: LogScope,
}

impl LogWriter {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>, scope: LogScope) -> Self {
        Self {
            fs,
            path: path.into(),
            scope,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn write(&self, lines: &[Line]) -> Result<()> {
        let text = self.render(lines);
        self.fs.write(&self.path, text.as_bytes())?;
        debug!(log = %self.path.display(), bytes = text.len(), "log written");
        Ok(())
    }

    fn render(&self, lines: &[Line]) -> String {
        let mut out: String = lines
            .iter()
            .filter(|line| match &self.scope {
                LogScope::AllLines => true,
                LogScope::Worker(me) => line.executed_by.last() == Some(me),
            })
            .filter_map(|line| line.output.as_deref())
            .collect();
        out.push('\n');
        out.push_str(&Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        out
    }
}
