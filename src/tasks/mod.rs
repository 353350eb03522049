//! Request lifecycle shared by every backend call.
//!
//! A task moves `Idle -> Pending -> Succeeded | Failed` and can be run again from any
//! state but `Pending`. The board hands out a ticket on `begin`; the ticket carries what
//! the response needs to prove it still belongs to the current draft.

pub mod board;

pub use board::{TaskBoard, TaskStatus, TaskTicket};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskName {
    StartVerification,
    ClassifyDocuments,
    ApplyNormative,
    AnalyzeDocuments,
    ChatbotStart,
    ChatbotMessage,
    GenerateChecklist,
    GenerateReport,
    ExportChecklist,
}

impl TaskName {
    pub const ALL: [TaskName; 9] = [
        TaskName::StartVerification,
        TaskName::ClassifyDocuments,
        TaskName::ApplyNormative,
        TaskName::AnalyzeDocuments,
        TaskName::ChatbotStart,
        TaskName::ChatbotMessage,
        TaskName::GenerateChecklist,
        TaskName::GenerateReport,
        TaskName::ExportChecklist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::StartVerification => "start-verification",
            TaskName::ClassifyDocuments => "classify-documents",
            TaskName::ApplyNormative => "apply-normative",
            TaskName::AnalyzeDocuments => "analyze-documents",
            TaskName::ChatbotStart => "chatbot-start",
            TaskName::ChatbotMessage => "chatbot-message",
            TaskName::GenerateChecklist => "generate-checklist",
            TaskName::GenerateReport => "generate-report",
            TaskName::ExportChecklist => "export-checklist",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskErrorKind {
    Network,
    Server { status: u16 },
    Decode,
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskErrorKind::Network => write!(f, "network"),
            TaskErrorKind::Server { status } => write!(f, "server ({status})"),
            TaskErrorKind::Decode => write!(f, "decode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{task} failed with {kind} error: {message}")]
pub struct AsyncTaskError {
    pub task: TaskName,
    pub kind: TaskErrorKind,
    pub message: String,
}

impl AsyncTaskError {
    pub fn decode(task: TaskName, message: impl Into<String>) -> Self {
        Self {
            task,
            kind: TaskErrorKind::Decode,
            message: message.into(),
        }
    }

    pub fn from_backend(task: TaskName, error: BackendError) -> Self {
        match error {
            BackendError::Network { message } => Self {
                task,
                kind: TaskErrorKind::Network,
                message,
            },
            BackendError::Server { status, message } => Self {
                task,
                kind: TaskErrorKind::Server { status },
                message,
            },
            BackendError::Decode { message } => Self::decode(task, message),
        }
    }
}

/// `begin` on a task that is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is already in progress")]
pub struct ConcurrentRequest(pub TaskName);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_names_match_wire_names() {
        for name in TaskName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
    }

    #[test]
    fn test_backend_errors_map_to_task_error_kinds() {
        let error = AsyncTaskError::from_backend(
            TaskName::AnalyzeDocuments,
            BackendError::Server {
                status: 502,
                message: "bad gateway".to_string(),
            },
        );
        assert_eq!(error.kind, TaskErrorKind::Server { status: 502 });
        assert_eq!(
            error.to_string(),
            "analyze-documents failed with server (502) error: bad gateway"
        );

        let error = AsyncTaskError::from_backend(TaskName::ChatbotStart, BackendError::network("refused"));
        assert_eq!(error.kind, TaskErrorKind::Network);
    }
}
