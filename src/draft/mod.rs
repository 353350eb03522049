//! Project draft: everything the user entered plus every payload the collaborators returned
//! for one verification attempt.

pub mod floors;
pub mod types;

pub use floors::{FloorLevel, FloorNumber, RangeKind, HIGHEST_FLOOR, LOWEST_BASEMENT};
pub use types::{
    DocumentKind, DocumentSelection, Documents, FileRef, RejectedFile, RejectionReason,
    SecondaryUse, UseType, PDF_MIME_TYPE,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

use crate::backend::types::{
    AnalysisResults, ClassificationResult, FinalChecklist, FinalReport, NormativeApplication,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("Invalid {kind} range: {from}..={to}")]
    InvalidRange { kind: RangeKind, from: i32, to: i32 },
    #[error("No PDF files in the {kind} selection")]
    NoValidFiles { kind: DocumentKind },
    #[error("Secondary uses are disabled")]
    SecondaryUsesDisabled,
    #[error("Secondary use not declared: {0}")]
    UnknownSecondaryUse(UseType),
    #[error("No {kind} document at index {index}")]
    DocumentIndexOutOfRange { kind: DocumentKind, index: usize },
    #[error("Job id already assigned: {existing}")]
    JobAlreadyAssigned { existing: String },
    #[error("Restored draft violates its invariants")]
    InconsistentDraft,
}

/// Summary kept once an ambiguity-resolution session completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub session_id: String,
    pub ambiguities_resolved: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    is_existing_building: bool,
    primary_use: Option<UseType>,
    has_secondary_uses: bool,
    secondary_uses: Vec<SecondaryUse>,
    documents: Documents,
    job_id: Option<String>,
    classification: Option<ClassificationResult>,
    normative_application: Option<NormativeApplication>,
    analysis_results: Option<AnalysisResults>,
    resolution: Option<ResolutionOutcome>,
    final_checklist: Option<FinalChecklist>,
    final_report: Option<FinalReport>,
    /// Bumped on every reset so in-flight responses can tell they belong to an older attempt.
    #[serde(skip)]
    generation: u64,
}

impl ProjectDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_existing_building(&self) -> bool {
        self.is_existing_building
    }

    pub fn primary_use(&self) -> Option<UseType> {
        self.primary_use
    }

    pub fn has_secondary_uses(&self) -> bool {
        self.has_secondary_uses
    }

    pub fn secondary_uses(&self) -> &[SecondaryUse] {
        &self.secondary_uses
    }

    pub fn secondary_use(&self, use_type: UseType) -> Option<&SecondaryUse> {
        self.secondary_uses.iter().find(|u| u.use_type == use_type)
    }

    pub fn documents(&self) -> &Documents {
        &self.documents
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn classification(&self) -> Option<&ClassificationResult> {
        self.classification.as_ref()
    }

    pub fn normative_application(&self) -> Option<&NormativeApplication> {
        self.normative_application.as_ref()
    }

    pub fn analysis_results(&self) -> Option<&AnalysisResults> {
        self.analysis_results.as_ref()
    }

    pub fn resolution(&self) -> Option<&ResolutionOutcome> {
        self.resolution.as_ref()
    }

    pub fn final_checklist(&self) -> Option<&FinalChecklist> {
        self.final_checklist.as_ref()
    }

    pub fn final_report(&self) -> Option<&FinalReport> {
        self.final_report.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_building_type(&mut self, is_existing_building: bool) {
        self.is_existing_building = is_existing_building;
    }

    pub fn set_primary_use(&mut self, use_type: Option<UseType>) {
        self.primary_use = use_type;
    }

    pub fn set_secondary_uses_enabled(&mut self, enabled: bool) {
        self.has_secondary_uses = enabled;
        if !enabled {
            self.secondary_uses.clear();
        }
        debug_assert!(self.invariants_hold());
    }

    /// Declare a secondary use. Adding one that is already declared leaves the list alone.
    pub fn add_secondary_use(&mut self, use_type: UseType) -> Result<(), DraftError> {
        if !self.has_secondary_uses {
            return Err(DraftError::SecondaryUsesDisabled);
        }
        if self.secondary_use(use_type).is_none() {
            self.secondary_uses.push(SecondaryUse::new(use_type));
        }
        Ok(())
    }

    pub fn remove_secondary_use(&mut self, use_type: UseType) -> Result<(), DraftError> {
        let index = self.secondary_use_index(use_type)?;
        self.secondary_uses.remove(index);
        Ok(())
    }

    pub fn set_floors_for_use(
        &mut self,
        use_type: UseType,
        floors: impl IntoIterator<Item = FloorLevel>,
    ) -> Result<(), DraftError> {
        let entry = self.secondary_use_mut(use_type)?;
        entry.floors = floors.into_iter().collect::<BTreeSet<_>>();
        Ok(())
    }

    /// Add every numbered floor of `from..=to`. On error the floors are left unchanged.
    pub fn add_floor_range(
        &mut self,
        use_type: UseType,
        kind: RangeKind,
        from: i32,
        to: i32,
    ) -> Result<(), DraftError> {
        let levels = kind
            .levels(from, to)
            .ok_or(DraftError::InvalidRange { kind, from, to })?;
        let entry = self.secondary_use_mut(use_type)?;
        entry.floors.extend(levels);
        debug!(use_type = %use_type, %kind, from, to, "Added floor range");
        Ok(())
    }

    pub fn add_special_floor(&mut self, use_type: UseType, level: FloorLevel) -> Result<(), DraftError> {
        self.secondary_use_mut(use_type)?.floors.insert(level);
        Ok(())
    }

    pub fn remove_floor(&mut self, use_type: UseType, level: FloorLevel) -> Result<(), DraftError> {
        self.secondary_use_mut(use_type)?.floors.remove(&level);
        Ok(())
    }

    /// Replace the files of one document slot with the PDFs of `files`.
    ///
    /// Non-PDF entries are rejected one by one; the memoria slot keeps only the first PDF.
    /// When nothing is accepted the previous selection stays in place.
    pub fn set_documents(
        &mut self,
        kind: DocumentKind,
        files: Vec<FileRef>,
    ) -> Result<DocumentSelection, DraftError> {
        let mut selection = DocumentSelection::default();
        let mut accepted = Vec::new();

        for file in files {
            if !file.is_pdf() {
                selection.rejected.push(RejectedFile {
                    name: file.name,
                    reason: RejectionReason::NotPdf,
                });
            } else if kind == DocumentKind::Memoria && !accepted.is_empty() {
                selection.rejected.push(RejectedFile {
                    name: file.name,
                    reason: RejectionReason::SlotFull,
                });
            } else {
                selection.accepted.push(file.name.clone());
                accepted.push(file);
            }
        }

        if accepted.is_empty() {
            return Err(DraftError::NoValidFiles { kind });
        }

        *self.documents.get_mut(kind) = accepted;
        debug!(
            %kind,
            accepted = selection.accepted.len(),
            rejected = selection.rejected.len(),
            "Document selection applied"
        );
        Ok(selection)
    }

    pub fn remove_document(&mut self, kind: DocumentKind, index: usize) -> Result<FileRef, DraftError> {
        let slot = self.documents.get_mut(kind);
        if index >= slot.len() {
            return Err(DraftError::DocumentIndexOutOfRange { kind, index });
        }
        Ok(slot.remove(index))
    }

    /// Record the job created by start-verification. A job id is never replaced; a new
    /// verification goes through `reset`.
    pub fn assign_job_id(&mut self, job_id: impl Into<String>) -> Result<(), DraftError> {
        if let Some(existing) = &self.job_id {
            return Err(DraftError::JobAlreadyAssigned {
                existing: existing.clone(),
            });
        }
        self.job_id = Some(job_id.into());
        Ok(())
    }

    pub(crate) fn set_classification(&mut self, payload: ClassificationResult) {
        self.classification = Some(payload);
    }

    pub(crate) fn set_normative_application(&mut self, payload: NormativeApplication) {
        self.normative_application = Some(payload);
    }

    pub(crate) fn set_analysis_results(&mut self, payload: AnalysisResults) {
        self.analysis_results = Some(payload);
    }

    pub(crate) fn set_resolution(&mut self, outcome: ResolutionOutcome) {
        self.resolution = Some(outcome);
    }

    pub(crate) fn set_final_checklist(&mut self, payload: FinalChecklist) {
        self.final_checklist = Some(payload);
    }

    pub(crate) fn set_final_report(&mut self, payload: FinalReport) {
        self.final_report = Some(payload);
    }

    /// Back to an empty draft for a fresh verification.
    pub fn reset(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    /// Take over the content of a restored draft; the generation keeps counting up.
    pub(crate) fn restore_from(&mut self, mut other: ProjectDraft) -> Result<(), DraftError> {
        if !other.invariants_hold() {
            return Err(DraftError::InconsistentDraft);
        }
        other.generation = self.generation.wrapping_add(1);
        *self = other;
        Ok(())
    }

    pub fn invariants_hold(&self) -> bool {
        let secondary_ok = self.has_secondary_uses || self.secondary_uses.is_empty();
        let unique_uses = {
            let mut seen = BTreeSet::new();
            self.secondary_uses.iter().all(|u| seen.insert(u.use_type))
        };
        let memoria_ok = self.documents.memoria.len() <= 1;
        let pdf_only = self
            .documents
            .memoria
            .iter()
            .chain(self.documents.planos.iter())
            .all(FileRef::is_pdf);

        secondary_ok && unique_uses && memoria_ok && pdf_only
    }

    fn secondary_use_index(&self, use_type: UseType) -> Result<usize, DraftError> {
        self.secondary_uses
            .iter()
            .position(|u| u.use_type == use_type)
            .ok_or(DraftError::UnknownSecondaryUse(use_type))
    }

    fn secondary_use_mut(&mut self, use_type: UseType) -> Result<&mut SecondaryUse, DraftError> {
        let index = self.secondary_use_index(use_type)?;
        Ok(&mut self.secondary_uses[index])
    }
}
