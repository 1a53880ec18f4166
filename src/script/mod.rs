// src/script/mod.rs

//! Script loading.
//!
//! - [`loader`] splits text into one [`Line`] per physical line.
//! - [`directives`] applies `# executor ...` comments.
//! - [`validate`] rejects unsupported commands and dependency cycles.
//! - [`line`] holds the per-line data model.
//!
//! A [`Script`] is built once and its shape never changes afterwards; only
//! the execution state of its lines is updated by the engine.

pub mod directives;
pub mod line;
pub mod loader;
pub mod validate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;

pub use line::{render_lines, AlwaysMode, Line, LineIndex, SkipReason, Status};

/// Parsed script: ordered lines plus derived lookup tables.
#[derive(Debug, Clone)]
pub struct Script {
    path: PathBuf,
    lines: Vec<Line>,
    tags: BTreeMap<String, LineIndex>,
    source_hash: String,
}

impl Script {
    /// Read and parse the script at `path`.
    pub fn load(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = loader::read_script(fs, path)?;
        Self::parse(path, &text)
    }

    /// Parse script text. `path` is only recorded, never read.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let mut lines = loader::split_lines(text);
        let tags = directives::resolve_directives(&mut lines)?;
        validate::validate_lines(&lines)?;

        debug!(
            path = %path.display(),
            lines = lines.len(),
            tags = tags.len(),
            "script parsed"
        );

        Ok(Self {
            path,
            lines,
            tags,
            source_hash: blake3::hash(text.as_bytes()).to_hex().to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// A copy of the lines with no execution state, as a fresh run starts.
    pub fn fresh_lines(&self) -> Vec<Line> {
        self.lines.clone()
    }

    pub fn line(&self, index: LineIndex) -> Option<&Line> {
        index.checked_sub(1).and_then(|i| self.lines.get(i))
    }

    pub fn tags(&self) -> &BTreeMap<String, LineIndex> {
        &self.tags
    }

    /// blake3 hash of the script text.
    pub fn source_hash(&self) -> &str {
        &self.source_hash
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Describe how `other` differs in shape from this script, or `None` if
    /// both have the same line count and identical original text per line.
    pub fn shape_mismatch(&self, other: &[Line]) -> Option<String> {
        if self.lines.len() != other.len() {
            return Some(format!(
                "script has {} lines, checkpoint has {}",
                self.lines.len(),
                other.len()
            ));
        }
        self.lines
            .iter()
            .zip(other)
            .find(|(mine, theirs)| mine.original_text != theirs.original_text)
            .map(|(mine, theirs)| {
                format!(
                    "line {} differs: script {:?}, checkpoint {:?}",
                    mine.index, mine.original_text, theirs.original_text
                )
            })
    }

    pub fn has_same_shape(&self, other: &[Line]) -> bool {
        self.shape_mismatch(other).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExectrError;
    use crate::fs::MockFileSystem;

    #[test]
    fn load_reads_through_filesystem() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/deploy.sh", "echo a\n# executor tag T\necho b\n");
        let script = Script::load(&fs, "/work/deploy.sh").unwrap();

        assert_eq!(script.len(), 3);
        assert_eq!(script.tags().get("T"), Some(&3));
        assert_eq!(script.line(3).and_then(|l| l.tag.as_deref()), Some("T"));
        assert!(script.line(0).is_none());
        assert!(script.line(4).is_none());
    }

    #[test]
    fn load_time_errors_surface_before_execution() {
        let err = Script::parse("s.sh", "# executor if MISSING\necho a").unwrap_err();
        assert!(matches!(err, ExectrError::DirectiveError { .. }));

        let err = Script::parse("s.sh", "echo a\nset -e").unwrap_err();
        assert!(matches!(err, ExectrError::ValidationError { .. }));
    }

    #[test]
    fn shape_comparison_uses_count_and_text() {
        let script = Script::parse("s.sh", "echo a\necho b").unwrap();
        let same = Script::parse("s.sh", "echo a\necho b").unwrap();
        let edited = Script::parse("s.sh", "echo a\necho B").unwrap();
        let longer = Script::parse("s.sh", "echo a\necho b\necho c").unwrap();

        assert!(script.has_same_shape(same.lines()));
        assert!(script.shape_mismatch(edited.lines()).unwrap().contains("line 2"));
        assert!(script.shape_mismatch(longer.lines()).unwrap().contains("3"));
        assert_eq!(script.source_hash(), same.source_hash());
        assert_ne!(script.source_hash(), edited.source_hash());
    }
}
