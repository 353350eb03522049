//! Pure step-completeness checks. Nothing here renders text; callers map the kinds to
//! messages.

use serde::{Deserialize, Serialize};

use super::definition::StepRule;
use crate::draft::{ProjectDraft, UseType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationErrorKind {
    MissingPrimaryUse,
    NoSecondaryUses,
    SecondaryUseWithoutFloors { use_type: UseType },
    MissingMemoria,
    MissingPlanos,
    AnalysisPending,
    NoDocumentsAnalyzed,
    AmbiguitiesUnresolved,
}

pub fn validation_error(rule: StepRule, draft: &ProjectDraft) -> Option<ValidationErrorKind> {
    match rule {
        StepRule::Always => None,
        StepRule::PrimaryUseSelected => draft
            .primary_use()
            .is_none()
            .then_some(ValidationErrorKind::MissingPrimaryUse),
        StepRule::SecondaryUsesComplete => secondary_uses_error(draft),
        StepRule::DocumentsPresent => {
            let documents = draft.documents();
            if documents.memoria.is_empty() {
                Some(ValidationErrorKind::MissingMemoria)
            } else if documents.planos.is_empty() {
                Some(ValidationErrorKind::MissingPlanos)
            } else {
                None
            }
        }
        StepRule::AnalysisComplete => match draft.analysis_results() {
            None => Some(ValidationErrorKind::AnalysisPending),
            Some(results) if results.documents_analyzed == 0 => {
                Some(ValidationErrorKind::NoDocumentsAnalyzed)
            }
            Some(_) => None,
        },
        StepRule::AmbiguitiesResolved => match draft.analysis_results() {
            None => Some(ValidationErrorKind::AnalysisPending),
            Some(results) if results.has_ambiguities() && draft.resolution().is_none() => {
                Some(ValidationErrorKind::AmbiguitiesUnresolved)
            }
            Some(_) => None,
        },
    }
}

pub fn can_advance(rule: StepRule, draft: &ProjectDraft) -> bool {
    validation_error(rule, draft).is_none()
}

fn secondary_uses_error(draft: &ProjectDraft) -> Option<ValidationErrorKind> {
    if !draft.has_secondary_uses() {
        return None;
    }
    if draft.secondary_uses().is_empty() {
        return Some(ValidationErrorKind::NoSecondaryUses);
    }
    draft
        .secondary_uses()
        .iter()
        .find(|u| u.floors.is_empty())
        .map(|u| ValidationErrorKind::SecondaryUseWithoutFloors {
            use_type: u.use_type,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::AnalysisResults;
    use crate::draft::{DocumentKind, FileRef, FloorLevel, ResolutionOutcome};
    use chrono::Utc;
    use serde_json::json;

    fn analysis(documents_analyzed: u32, ambiguities_detected: u32) -> AnalysisResults {
        serde_json::from_value(json!({
            "documents_analyzed": documents_analyzed,
            "ambiguities_detected": ambiguities_detected
        }))
        .unwrap()
    }

    #[test]
    fn test_primary_use_rule() {
        let mut draft = ProjectDraft::new();
        assert_eq!(
            validation_error(StepRule::PrimaryUseSelected, &draft),
            Some(ValidationErrorKind::MissingPrimaryUse)
        );
        draft.set_primary_use(Some(UseType::Residencial));
        assert!(can_advance(StepRule::PrimaryUseSelected, &draft));
    }

    #[test]
    fn test_secondary_uses_need_floors_when_enabled() {
        let mut draft = ProjectDraft::new();
        assert!(can_advance(StepRule::SecondaryUsesComplete, &draft));

        draft.set_secondary_uses_enabled(true);
        assert_eq!(
            validation_error(StepRule::SecondaryUsesComplete, &draft),
            Some(ValidationErrorKind::NoSecondaryUses)
        );

        draft.add_secondary_use(UseType::GarajeAparcamiento).unwrap();
        assert_eq!(
            validation_error(StepRule::SecondaryUsesComplete, &draft),
            Some(ValidationErrorKind::SecondaryUseWithoutFloors {
                use_type: UseType::GarajeAparcamiento
            })
        );

        draft
            .add_special_floor(UseType::GarajeAparcamiento, FloorLevel::SubMezzanine)
            .unwrap();
        assert!(can_advance(StepRule::SecondaryUsesComplete, &draft));
    }

    #[test]
    fn test_documents_rule_needs_both_kinds() {
        let mut draft = ProjectDraft::new();
        draft
            .set_documents(DocumentKind::Planos, vec![FileRef::pdf("p.pdf", 1)])
            .unwrap();
        assert_eq!(
            validation_error(StepRule::DocumentsPresent, &draft),
            Some(ValidationErrorKind::MissingMemoria)
        );
        draft
            .set_documents(DocumentKind::Memoria, vec![FileRef::pdf("m.pdf", 1)])
            .unwrap();
        assert!(can_advance(StepRule::DocumentsPresent, &draft));
    }

    #[test]
    fn test_analysis_and_ambiguity_rules() {
        let mut draft = ProjectDraft::new();
        assert_eq!(
            validation_error(StepRule::AnalysisComplete, &draft),
            Some(ValidationErrorKind::AnalysisPending)
        );

        draft.set_analysis_results(analysis(0, 0));
        assert_eq!(
            validation_error(StepRule::AnalysisComplete, &draft),
            Some(ValidationErrorKind::NoDocumentsAnalyzed)
        );

        draft.set_analysis_results(analysis(2, 0));
        assert!(can_advance(StepRule::AnalysisComplete, &draft));
        assert!(can_advance(StepRule::AmbiguitiesResolved, &draft));

        draft.set_analysis_results(analysis(2, 3));
        assert_eq!(
            validation_error(StepRule::AmbiguitiesResolved, &draft),
            Some(ValidationErrorKind::AmbiguitiesUnresolved)
        );

        draft.set_resolution(ResolutionOutcome {
            session_id: "s-1".to_string(),
            ambiguities_resolved: 3,
            completed_at: Utc::now(),
        });
        assert!(can_advance(StepRule::AmbiguitiesResolved, &draft));
    }
}
