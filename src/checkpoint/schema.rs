// src/checkpoint/schema.rs

//! Versioned on-disk representation of a checkpoint.
//!
//! These types are deliberately separate from [`Line`] so the file layout can
//! evolve independently of the in-memory model. Bump [`SCHEMA_VERSION`] on
//! any incompatible change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coord::WorkerIdentity;
use crate::errors::{ExectrError, Result};
use crate::script::{AlwaysMode, Line, SkipReason, Status};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub schema_version: u32,
    pub script_path: String,
    /// blake3 of the script text the checkpoint was written for.
    pub script_hash: String,
    pub saved_at: DateTime<Utc>,
    pub lines: Vec<LineRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub original_text: String,
    pub status: StatusRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReasonRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub always: AlwaysRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retcode: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executed_by: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusRecord {
    Untreated,
    Executing,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SkipReasonRecord {
    Operator,
    DependencyFailed { line: usize },
    DependencySkipped { line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlwaysRecord {
    #[default]
    No,
    Always,
    AlwaysTry,
}

impl From<&Line> for LineRecord {
    fn from(line: &Line) -> Self {
        let (status, skip_reason) = match line.status {
            Status::Untreated => (StatusRecord::Untreated, None),
            Status::Executing => (StatusRecord::Executing, None),
            Status::Succeeded => (StatusRecord::Succeeded, None),
            Status::Failed => (StatusRecord::Failed, None),
            Status::Skipped(reason) => (StatusRecord::Skipped, Some(reason.into())),
        };

        Self {
            index: line.index,
            command: line.command.clone(),
            original_text: line.original_text.clone(),
            status,
            skip_reason,
            dependencies: line.dependencies.iter().copied().collect(),
            tag: line.tag.clone(),
            always: line.always.into(),
            retcode: line.retcode,
            output: line.output.clone(),
            start_time: line.start_time,
            end_time: line.end_time,
            executed_by: line.executed_by.iter().map(ToString::to_string).collect(),
        }
    }
}

impl TryFrom<LineRecord> for Line {
    type Error = ExectrError;

    fn try_from(record: LineRecord) -> Result<Self> {
        let status = match (record.status, record.skip_reason) {
            (StatusRecord::Untreated, _) => Status::Untreated,
            (StatusRecord::Executing, _) => Status::Executing,
            (StatusRecord::Succeeded, _) => Status::Succeeded,
            (StatusRecord::Failed, _) => Status::Failed,
            (StatusRecord::Skipped, Some(reason)) => Status::Skipped(reason.into()),
            (StatusRecord::Skipped, None) => {
                return Err(ExectrError::CheckpointError(format!(
                    "line {} is skipped without a reason",
                    record.index
                )));
            }
        };

        let executed_by = record
            .executed_by
            .iter()
            .map(|s| s.parse::<WorkerIdentity>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ExectrError::CheckpointError(format!("line {}: {e}", record.index)))?;

        let mut line = Line::new(record.index, record.command, record.original_text);
        line.status = status;
        line.dependencies = record.dependencies.into_iter().collect();
        line.tag = record.tag;
        line.always = record.always.into();
        line.retcode = record.retcode;
        line.output = record.output;
        line.start_time = record.start_time;
        line.end_time = record.end_time;
        line.executed_by = executed_by;
        Ok(line)
    }
}

impl From<SkipReason> for SkipReasonRecord {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::Operator => SkipReasonRecord::Operator,
            SkipReason::DependencyFailed(line) => SkipReasonRecord::DependencyFailed { line },
            SkipReason::DependencySkipped(line) => SkipReasonRecord::DependencySkipped { line },
        }
    }
}

impl From<SkipReasonRecord> for SkipReason {
    fn from(record: SkipReasonRecord) -> Self {
        match record {
            SkipReasonRecord::Operator => SkipReason::Operator,
            SkipReasonRecord::DependencyFailed { line } => SkipReason::DependencyFailed(line),
            SkipReasonRecord::DependencySkipped { line } => SkipReason::DependencySkipped(line),
        }
    }
}

impl From<AlwaysMode> for AlwaysRecord {
    fn from(mode: AlwaysMode) -> Self {
        match mode {
            AlwaysMode::No => AlwaysRecord::No,
            AlwaysMode::Always => AlwaysRecord::Always,
            AlwaysMode::AlwaysTry => AlwaysRecord::AlwaysTry,
        }
    }
}

impl From<AlwaysRecord> for AlwaysMode {
    fn from(record: AlwaysRecord) -> Self {
        match record {
            AlwaysRecord::No => AlwaysMode::No,
            AlwaysRecord::Always => AlwaysMode::Always,
            AlwaysRecord::AlwaysTry => AlwaysMode::AlwaysTry,
        }
    }
}

/// Decode checkpoint JSON, checking the schema version first so an
/// incompatible file is reported as such rather than as a field error.
pub fn decode(text: &str) -> Result<CheckpointFile> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ExectrError::CheckpointError(format!("not a checkpoint file: {e}")))?;

    let version = value
        .get("schema_version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| ExectrError::CheckpointError("missing schema_version".to_string()))?;
    if version != u64::from(SCHEMA_VERSION) {
        return Err(ExectrError::CheckpointError(format!(
            "unsupported schema_version {version} (this build reads {SCHEMA_VERSION})"
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| ExectrError::CheckpointError(format!("malformed checkpoint: {e}")))
}

pub fn encode(file: &CheckpointFile) -> Result<String> {
    Ok(serde_json::to_string_pretty(file)?)
}
