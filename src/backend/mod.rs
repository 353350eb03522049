//! Verification backend abstractions
//!
//! One method per collaborator call. The workflow only ever talks to a
//! `VerificationBackend`, so tests swap in a mock and the CLI wires the HTTP binding.

pub mod http;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

pub use http::HttpBackend;
use types::{
    AnalysisResults, AnalyzeRequest, ApplyNormativeRequest, ChatbotMessageRequest, ChatbotReply,
    ChatbotStartRequest, ChatbotStartResponse, ChecklistRequest, ClassificationResult,
    ClassifyRequest, ExportPayload, FinalChecklist, FinalReport, NormativeApplication,
    ReportRequest, StartVerificationRequest, StartVerificationResponse,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Network error: {message}")]
    Network { message: String },
    #[error("Server responded with status {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Invalid response payload: {message}")]
    Decode { message: String },
}

impl BackendError {
    pub fn network(message: impl Into<String>) -> Self {
        BackendError::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        BackendError::Decode {
            message: message.into(),
        }
    }
}

/// Trait for the verification collaborators
///
/// Implementations never retry; a failed call is reported once and the caller decides
/// whether to run it again.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    /// Create a verification job for the project
    async fn start_verification(
        &self,
        request: &StartVerificationRequest,
    ) -> Result<StartVerificationResponse, BackendError>;

    /// Upload the documents and classify them as memoria or plano
    async fn classify_documents(
        &self,
        request: &ClassifyRequest,
    ) -> Result<ClassificationResult, BackendError>;

    /// Attach the regulations that apply to the declared uses
    async fn apply_normative(
        &self,
        request: &ApplyNormativeRequest,
    ) -> Result<NormativeApplication, BackendError>;

    async fn analyze_documents(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalysisResults, BackendError>;

    async fn start_chatbot(
        &self,
        request: &ChatbotStartRequest,
    ) -> Result<ChatbotStartResponse, BackendError>;

    async fn send_chatbot_message(
        &self,
        request: &ChatbotMessageRequest,
    ) -> Result<ChatbotReply, BackendError>;

    async fn generate_checklist(
        &self,
        request: &ChecklistRequest,
    ) -> Result<FinalChecklist, BackendError>;

    async fn generate_report(&self, request: &ReportRequest) -> Result<FinalReport, BackendError>;

    /// Download the checklist export for a job
    async fn export_checklist(&self, job_id: &str) -> Result<ExportPayload, BackendError>;
}
