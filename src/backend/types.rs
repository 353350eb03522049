// Request/response contracts of the verification collaborators
//
// Responses are parsed into these structures at the boundary and checked with
// `ValidatePayload` before anything in the workflow reads them. Fields the core does not
// interpret are kept in `extra` so payloads survive a round trip untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::draft::{Documents, FileRef, ProjectDraft, SecondaryUse, UseType};

/// Semantic checks applied once a response has been deserialized.
pub trait ValidatePayload {
    fn validate(&self) -> Result<(), String>;
}

/// Project metadata shared by most requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub is_existing_building: bool,
    pub primary_use: Option<UseType>,
    pub has_secondary_uses: bool,
    #[serde(default)]
    pub secondary_uses: Vec<SecondaryUse>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl From<&ProjectDraft> for ProjectData {
    fn from(draft: &ProjectDraft) -> Self {
        Self {
            project_id: draft.job_id().map(str::to_string),
            is_existing_building: draft.is_existing_building(),
            primary_use: draft.primary_use(),
            has_secondary_uses: draft.has_secondary_uses(),
            secondary_uses: draft.secondary_uses().to_vec(),
            files: draft.documents().names(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartVerificationRequest {
    #[serde(flatten)]
    pub project: ProjectData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartVerificationResponse {
    pub job_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidatePayload for StartVerificationResponse {
    fn validate(&self) -> Result<(), String> {
        if self.job_id.trim().is_empty() {
            return Err("start verification response has an empty job_id".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifyRequest {
    pub job_id: String,
    pub project: ProjectData,
    pub memoria: Vec<FileRef>,
    pub planos: Vec<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileClassification {
    #[serde(default)]
    pub document_type: Option<String>,
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedFile {
    pub filename: String,
    pub classification: FileClassification,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(default)]
    pub memoria_files: Vec<ClassifiedFile>,
    #[serde(default)]
    pub plano_files: Vec<ClassifiedFile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationSummary {
    pub memoria_count: usize,
    pub plano_count: usize,
    pub average_confidence: f64,
    pub high_confidence_files: usize,
    pub low_confidence_files: usize,
}

impl ClassificationResult {
    pub fn files(&self) -> impl Iterator<Item = &ClassifiedFile> {
        self.memoria_files.iter().chain(self.plano_files.iter())
    }

    pub fn summary(&self) -> ClassificationSummary {
        let confidences: Vec<f64> = self.files().map(|f| f.classification.confidence).collect();
        let average_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        };

        ClassificationSummary {
            memoria_count: self.memoria_files.len(),
            plano_count: self.plano_files.len(),
            average_confidence,
            high_confidence_files: confidences.iter().filter(|c| **c > 0.8).count(),
            low_confidence_files: confidences.iter().filter(|c| **c < 0.6).count(),
        }
    }
}

impl ValidatePayload for ClassificationResult {
    fn validate(&self) -> Result<(), String> {
        for file in self.files() {
            let confidence = file.classification.confidence;
            if !(0.0..=1.0).contains(&confidence) {
                return Err(format!(
                    "classification confidence {confidence} for '{}' is outside [0, 1]",
                    file.filename
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyNormativeRequest {
    pub project_id: String,
    pub primary_use: UseType,
    pub secondary_uses: Vec<SecondaryUse>,
    pub is_existing_building: bool,
    pub document_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormativeApplication {
    pub applicable_documents: Vec<Value>,
    pub floor_assignments: Value,
    pub compliance_requirements: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidatePayload for NormativeApplication {
    fn validate(&self) -> Result<(), String> {
        if !(self.floor_assignments.is_object() || self.floor_assignments.is_array()) {
            return Err("floor_assignments must be an object or a list".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeRequest {
    pub project_data: ProjectData,
    pub files: Documents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ambiguity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub documents_analyzed: u32,
    pub ambiguities_detected: u32,
    #[serde(default)]
    pub compliance_issues: u32,
    #[serde(default)]
    pub analysis_details: Vec<Value>,
    #[serde(default)]
    pub ambiguities: Vec<Ambiguity>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResults {
    pub fn has_ambiguities(&self) -> bool {
        self.ambiguities_detected > 0 || !self.ambiguities.is_empty()
    }
}

impl ValidatePayload for AnalysisResults {
    fn validate(&self) -> Result<(), String> {
        if (self.ambiguities.len() as u64) > u64::from(self.ambiguities_detected) {
            return Err(format!(
                "analysis lists {} ambiguities but reports {} detected",
                self.ambiguities.len(),
                self.ambiguities_detected
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatbotStartRequest {
    pub project_data: ProjectData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnType {
    Question,
    Clarification,
    Confirmation,
    Information,
    Error,
    Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    #[serde(alias = "text", alias = "title")]
    pub label: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub turn_type: Option<TurnType>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotStartResponse {
    pub session_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub state: String,
    pub ambiguities_count: u32,
    #[serde(default)]
    pub message: Option<ChatbotMessage>,
    #[serde(default)]
    pub requires_response: bool,
}

impl ValidatePayload for ChatbotStartResponse {
    fn validate(&self) -> Result<(), String> {
        if self.session_id.trim().is_empty() {
            return Err("chatbot start response has an empty session_id".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotMessageRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub ambiguities_remaining: Option<u32>,
    #[serde(default)]
    pub ambiguities_resolved: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotReply {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(rename = "type")]
    pub turn_type: TurnType,
    pub content: String,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub requires_response: bool,
    #[serde(default)]
    pub session_status: Option<SessionStatus>,
}

impl ChatbotReply {
    pub fn is_completion(&self) -> bool {
        self.turn_type == TurnType::Completion
    }
}

impl ValidatePayload for ChatbotReply {
    fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() && !self.is_completion() {
            return Err("chatbot reply has no content".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistRequest {
    pub project_data: ProjectData,
    pub normative_application: Option<NormativeApplication>,
    pub compliance_results: Option<AnalysisResults>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistCategory {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub completion_percentage: f64,
    #[serde(default)]
    pub total_items: u32,
    #[serde(default)]
    pub completed_items: u32,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalChecklist {
    pub overall_completion: f64,
    pub completed_items: u32,
    pub total_items: u32,
    pub critical_items: u32,
    #[serde(default)]
    pub categories: Vec<ChecklistCategory>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidatePayload for FinalChecklist {
    fn validate(&self) -> Result<(), String> {
        if self.completed_items > self.total_items {
            return Err(format!(
                "checklist reports {} completed of {} items",
                self.completed_items, self.total_items
            ));
        }
        if !(0.0..=100.0).contains(&self.overall_completion) {
            return Err(format!(
                "overall completion {} is outside [0, 100]",
                self.overall_completion
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRequest {
    pub project_data: ProjectData,
    pub normative_application: Option<NormativeApplication>,
    pub compliance_results: Option<AnalysisResults>,
    pub checklist_data: Option<FinalChecklist>,
}

/// Rendered report document; the core never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalReport(pub Value);

impl ValidatePayload for FinalReport {
    fn validate(&self) -> Result<(), String> {
        if !self.0.is_object() {
            return Err("report payload must be a JSON object".to_string());
        }
        Ok(())
    }
}

/// Downloadable export keyed by job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub job_id: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl ValidatePayload for ExportPayload {
    fn validate(&self) -> Result<(), String> {
        if self.body.is_empty() {
            return Err(format!("export for job {} is empty", self.job_id));
        }
        Ok(())
    }
}
