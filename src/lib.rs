// Compliance Wizard Library - building-permit compliance verification workflow
// This exposes the core components for testing and integration

pub mod backend;
pub mod cli;
pub mod config;
pub mod draft;
pub mod observability;
pub mod presenter;
pub mod resolution;
pub mod tasks;
pub mod telemetry;
pub mod wizard;
pub mod workflow;

// Re-export key types for easy access
pub use backend::{BackendError, HttpBackend, VerificationBackend};
pub use config::WizardConfig;
pub use draft::{
    DocumentKind, DraftError, FileRef, FloorLevel, ProjectDraft, RangeKind, UseType,
};
pub use observability::{OperationTimer, WorkflowMetrics, WorkflowStats};
pub use presenter::{summarize, CompletionStatus, ResultsSummary};
pub use resolution::{AmbiguityResolutionEngine, SessionError, SessionPhase};
pub use tasks::{AsyncTaskError, TaskBoard, TaskName, TaskStatus};
pub use telemetry::{create_task_span, generate_correlation_id, init_telemetry};
pub use wizard::{
    Direction, StepEffect, StepRule, ValidationErrorKind, WizardController, WizardMode,
    WorkflowDefinition,
};
pub use workflow::{
    VerificationWorkflow, WorkflowError, WorkflowEvent, WorkflowSettings, WorkflowSnapshot,
};
