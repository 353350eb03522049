//! The verification workflow: one explicitly constructed orchestrator wiring the draft,
//! the wizard, the task board and the ambiguity session to a backend.

pub mod errors;
pub mod events;
pub mod notifications;
pub mod orchestrator;

pub use errors::{ErrorKind, Precondition, WorkflowError};
pub use events::{EventBus, WorkflowEvent};
pub use notifications::{Notification, NotificationCenter, NotificationKind, NotificationLevel};
pub use orchestrator::VerificationWorkflow;

use serde::Serialize;
use std::time::Duration;

use crate::backend::types::ClassificationSummary;
use crate::config::WizardConfig;
use crate::draft::ProjectDraft;
use crate::presenter::ResultsSummary;
use crate::resolution::SessionView;
use crate::tasks::{TaskName, TaskStatus};
use crate::wizard::{ValidationErrorKind, WizardMode};

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub auto_advance_after_resolution: bool,
    pub notification_ttl: Duration,
    pub max_notifications: usize,
    pub event_capacity: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            auto_advance_after_resolution: true,
            notification_ttl: Duration::from_secs(8),
            max_notifications: 5,
            event_capacity: 64,
        }
    }
}

impl From<&WizardConfig> for WorkflowSettings {
    fn from(config: &WizardConfig) -> Self {
        Self {
            auto_advance_after_resolution: config.workflow.auto_advance_after_resolution,
            notification_ttl: config.notifications.ttl(),
            max_notifications: config.notifications.max_visible,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationAffordances {
    pub can_go_back: bool,
    pub can_go_forward: bool,
    /// Why forward is blocked by the current step's data
    pub blocked_by: Option<ValidationErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub name: TaskName,
    pub status: TaskStatus,
}

/// Everything a UI needs to render the workflow at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub draft: ProjectDraft,
    pub mode: WizardMode,
    pub max_steps: usize,
    pub step_title: Option<String>,
    pub visible_steps: Vec<usize>,
    pub progress: f64,
    pub affordances: NavigationAffordances,
    pub tasks: Vec<TaskSnapshot>,
    pub session: SessionView,
    pub notifications: Vec<Notification>,
    pub classification_summary: Option<ClassificationSummary>,
    pub results: Option<ResultsSummary>,
}

impl WorkflowSnapshot {
    pub fn task(&self, name: TaskName) -> Option<&TaskStatus> {
        self.tasks.iter().find(|t| t.name == name).map(|t| &t.status)
    }
}
