//! Structured exit status returned by every command

use serde::{Deserialize, Serialize};
use std::process::ExitCode;

/// What a command wants to tell its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// Nothing to report
    Success,
    /// Imported packages are not declared
    MissingFound,
    /// Declared packages are not imported
    UnusedFound,
    /// Both of the above
    MissingAndUnused,
    /// Check mode found edits that would be written
    ChangesPending,
    /// Completed, but some packages failed
    PartialFailure,
}

impl ExitStatus {
    /// Process exit code for this status
    pub fn code(&self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::MissingFound => 1,
            ExitStatus::UnusedFound => 2,
            ExitStatus::MissingAndUnused => 3,
            ExitStatus::ChangesPending => 4,
            ExitStatus::PartialFailure => 5,
        }
    }

    /// Returns true for `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    /// Keeps the more severe of two statuses; findings outrank pending changes
    pub fn combine(self, other: ExitStatus) -> ExitStatus {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::ChangesPending => 1,
            ExitStatus::PartialFailure => 2,
            ExitStatus::UnusedFound => 3,
            ExitStatus::MissingFound => 4,
            ExitStatus::MissingAndUnused => 5,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}
