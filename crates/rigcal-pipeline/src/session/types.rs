//! Session bookkeeping: metadata and the step log.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Identity and timestamps of a session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub problem_type: String,
    pub schema_version: u32,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
    pub last_modified: u64,
    #[serde(default)]
    pub description: Option<String>,
}

impl SessionMetadata {
    pub fn new(problem_type: impl Into<String>, schema_version: u32) -> Self {
        let now = current_timestamp();
        Self {
            problem_type: problem_type.into(),
            schema_version,
            created_at: now,
            last_modified: now,
            description: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_modified = current_timestamp();
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Done { summary: String },
    Failed { error: String },
}

/// One step run on a session (`acquire`, `calibrate`, `verify`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: u64,
    pub step: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl LogEntry {
    pub fn done(step: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(
            step,
            StepOutcome::Done {
                summary: summary.into(),
            },
        )
    }

    pub fn failed(step: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            step,
            StepOutcome::Failed {
                error: error.into(),
            },
        )
    }

    fn new(step: impl Into<String>, outcome: StepOutcome) -> Self {
        Self {
            timestamp: current_timestamp(),
            step: step.into(),
            outcome,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, StepOutcome::Failed { .. })
    }
}

/// Seconds since the Unix epoch; `0` if the clock is before it.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
