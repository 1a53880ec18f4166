// src/coord/identity.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Identity of one worker process: process id plus start time.
///
/// The start time is kept at microsecond precision so the text encoding
/// (`PID@RFC3339`) round-trips exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerIdentity {
    pid: u32,
    started_at: DateTime<Utc>,
}

impl WorkerIdentity {
    pub fn new(pid: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            pid,
            started_at: started_at.trunc_subsecs(6),
        }
    }

    /// Identity of the running process, started now.
    pub fn current() -> Self {
        Self::new(std::process::id(), Utc::now())
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Filesystem-safe token, used to name per-worker log files.
    pub fn file_token(&self) -> String {
        format!("{}-{}", self.pid, self.started_at.timestamp_micros())
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.pid,
            self.started_at.to_rfc3339_opts(SecondsFormat::Micros, true)
        )
    }
}

impl FromStr for WorkerIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (pid, started_at) = s
            .split_once('@')
            .ok_or_else(|| format!("invalid worker identity {s:?} (expected PID@TIMESTAMP)"))?;
        let pid = pid
            .parse::<u32>()
            .map_err(|e| format!("invalid worker pid in {s:?}: {e}"))?;
        let started_at = DateTime::parse_from_rfc3339(started_at)
            .map_err(|e| format!("invalid worker timestamp in {s:?}: {e}"))?
            .with_timezone(&Utc);
        Ok(Self::new(pid, started_at))
    }
}
