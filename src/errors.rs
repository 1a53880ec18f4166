// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Command failures (nonzero exit codes) are *not* errors: they are recorded
//! as `Failed` line status and handled by the scheduler rules.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExectrError {
    #[error("Cannot read script: {0}")]
    ParseError(String),

    #[error("Directive error on line {line}: {message}\n  {text}")]
    DirectiveError {
        line: usize,
        text: String,
        message: String,
    },

    #[error("Line {line} is not supported: {message}\n  {text}")]
    ValidationError {
        line: usize,
        text: String,
        message: String,
    },

    #[error("Coordination error: {0}")]
    CoordinationError(String),

    #[error(
        "Line {line} is still marked EXECUTING in the checkpoint (a crashed or live distributed run). \
         Use --distributed to join it, or --rerun-all to discard the checkpoint.\n  {text}"
    )]
    StaleStateError { line: usize, text: String },

    #[error("Checkpoint does not match the current script: {0}")]
    ScriptDriftError(String),

    #[error("Checkpoint error: {0}")]
    CheckpointError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExectrError {
    pub(crate) fn directive(line: usize, text: &str, message: impl Into<String>) -> Self {
        ExectrError::DirectiveError {
            line,
            text: text.to_string(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ExectrError>;
