use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::draft::DraftError;
use crate::resolution::SessionError;
use crate::tasks::{AsyncTaskError, ConcurrentRequest, TaskErrorKind, TaskName};
use crate::wizard::ValidationErrorKind;

/// Something the workflow needs before an operation can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum Precondition {
    #[error("verification has not been started")]
    JobNotStarted,
    #[error("verification already started; start a new verification instead")]
    JobAlreadyStarted,
    #[error("primary use is not selected")]
    PrimaryUseMissing,
    #[error("memoria and planos are required")]
    DocumentsMissing,
    #[error("analysis results are not available")]
    AnalysisMissing,
    #[error("analysis reported no ambiguities")]
    NoAmbiguities,
    #[error("final checklist has not been generated")]
    ChecklistMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Step is incomplete: {0:?}")]
    Validation(ValidationErrorKind),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    ConcurrentRequest(#[from] ConcurrentRequest),
    #[error(transparent)]
    Task(#[from] AsyncTaskError),
    #[error("Discarded stale {task} response")]
    StaleSession { task: TaskName },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Precondition failed: {0}")]
    Precondition(#[from] Precondition),
}

/// Flat classification of a `WorkflowError`, carried by notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Draft,
    ConcurrentRequest,
    Network,
    Server,
    Decode,
    StaleSession,
    Session,
    Precondition,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::Draft(_) => ErrorKind::Draft,
            WorkflowError::ConcurrentRequest(_) => ErrorKind::ConcurrentRequest,
            WorkflowError::Task(error) => match error.kind {
                TaskErrorKind::Network => ErrorKind::Network,
                TaskErrorKind::Server { .. } => ErrorKind::Server,
                TaskErrorKind::Decode => ErrorKind::Decode,
            },
            WorkflowError::StaleSession { .. } => ErrorKind::StaleSession,
            WorkflowError::Session(_) => ErrorKind::Session,
            WorkflowError::Precondition(_) => ErrorKind::Precondition,
        }
    }

    /// Stale responses are only logged; everything else reaches the user.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, WorkflowError::StaleSession { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_errors_keep_their_transport_kind() {
        let error = WorkflowError::from(AsyncTaskError::decode(
            TaskName::GenerateChecklist,
            "missing field `total_items`",
        ));
        assert_eq!(error.kind(), ErrorKind::Decode);
        assert!(error.is_user_visible());

        let stale = WorkflowError::StaleSession {
            task: TaskName::ChatbotMessage,
        };
        assert_eq!(stale.kind(), ErrorKind::StaleSession);
        assert!(!stale.is_user_visible());
    }
}
