use std::fmt::{Display, Formatter};

use crate::error::ModelError;

/// Lifecycle status of an assessment process row.
///
/// Once a run reaches a terminal status it is never promoted back to a
/// better one; downgrades (for example `Completed` to `PartiallyCompleted`
/// after a failed commit) are the only in-place transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessStatus {
    Pending,
    InProgress,
    Completed,
    PartiallyCompleted,
    NotSupported,
    Failed,
    Cancelled,
}

impl ProcessStatus {
    /// Wire code persisted on the process row.
    pub fn as_code(&self) -> &'static str {
        match self {
            ProcessStatus::Pending => "PEND",
            ProcessStatus::InProgress => "PROC",
            ProcessStatus::Completed => "CMPL",
            ProcessStatus::PartiallyCompleted => "PC",
            ProcessStatus::NotSupported => "NS",
            ProcessStatus::Failed => "FAIL",
            ProcessStatus::Cancelled => "CNCL",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ModelError> {
        match code {
            "PEND" => Ok(ProcessStatus::Pending),
            "PROC" => Ok(ProcessStatus::InProgress),
            "CMPL" => Ok(ProcessStatus::Completed),
            "PC" => Ok(ProcessStatus::PartiallyCompleted),
            "NS" => Ok(ProcessStatus::NotSupported),
            "FAIL" => Ok(ProcessStatus::Failed),
            "CNCL" => Ok(ProcessStatus::Cancelled),
            other => {
                Err(ModelError::InvalidCode(format!("unknown status: {other}")))
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessStatus::Pending | ProcessStatus::InProgress)
    }

    /// Whether findings from this run were good enough to merge and report.
    pub fn is_report_worthy(&self) -> bool {
        matches!(
            self,
            ProcessStatus::Completed | ProcessStatus::PartiallyCompleted
        )
    }
}

impl Display for ProcessStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for status in [
            ProcessStatus::Pending,
            ProcessStatus::InProgress,
            ProcessStatus::Completed,
            ProcessStatus::PartiallyCompleted,
            ProcessStatus::NotSupported,
            ProcessStatus::Failed,
            ProcessStatus::Cancelled,
        ] {
            assert_eq!(
                ProcessStatus::from_code(status.as_code()).unwrap(),
                status
            );
        }
    }

    #[test]
    fn terminal_classification() {
        assert!(!ProcessStatus::Pending.is_terminal());
        assert!(!ProcessStatus::InProgress.is_terminal());
        assert!(ProcessStatus::Cancelled.is_terminal());
        assert!(ProcessStatus::PartiallyCompleted.is_terminal());
    }
}
