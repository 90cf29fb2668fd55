//! Process instance status.

use serde::{Deserialize, Serialize};

/// Lifecycle of a process instance.
///
/// ```text
/// Pending ──┬──► Succeeded
///           └──► Failed
/// ```
/// Both end states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProcessStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
}

impl ProcessStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Pending => "Pending",
            ProcessStatus::Succeeded => "Succeeded",
            ProcessStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
