// src/types.rs

use std::fmt;
use std::str::FromStr;

/// How a worker shares state with other workers.
///
/// - `Single`: one worker owns the checkpoint; no lock is taken and the
///   checkpoint is written from memory.
/// - `Distributed`: several worker processes cooperate on the same script;
///   every checkpoint read-modify-write happens under the coordination lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Single,
    Distributed,
}

impl ExecutionMode {
    pub fn is_distributed(self) -> bool {
        matches!(self, ExecutionMode::Distributed)
    }
}

/// Operator choice when a checkpoint for an unchanged script already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    /// Resume where the previous attempt stopped.
    Continue,
    /// Reset failed and skipped lines, keep succeeded ones, then resume.
    RerunFailed,
    /// Discard the checkpoint and start from scratch.
    RerunAll,
    /// Print the checkpointed state and ask again.
    Display,
    Abort,
}

impl FromStr for ResumeChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" | "continue" => Ok(ResumeChoice::Continue),
            "f" | "rerun-failed" => Ok(ResumeChoice::RerunFailed),
            "a" | "rerun-all" => Ok(ResumeChoice::RerunAll),
            "d" | "display" => Ok(ResumeChoice::Display),
            "q" | "abort" => Ok(ResumeChoice::Abort),
            other => Err(format!("unknown choice {other:?}")),
        }
    }
}

impl fmt::Display for ResumeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResumeChoice::Continue => "continue",
            ResumeChoice::RerunFailed => "rerun-failed",
            ResumeChoice::RerunAll => "rerun-all",
            ResumeChoice::Display => "display",
            ResumeChoice::Abort => "abort",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_choice_accepts_short_and_long_forms() {
        assert_eq!("c".parse::<ResumeChoice>(), Ok(ResumeChoice::Continue));
        assert_eq!(" F ".parse::<ResumeChoice>(), Ok(ResumeChoice::RerunFailed));
        assert_eq!("rerun-all".parse::<ResumeChoice>(), Ok(ResumeChoice::RerunAll));
        assert_eq!("q".parse::<ResumeChoice>(), Ok(ResumeChoice::Abort));
        assert!("x".parse::<ResumeChoice>().is_err());
    }
}
