// Data-driven step layout
//
// A definition is an ordered list of steps, each with the rule gating forward navigation
// out of it and an optional effect run when it is entered going forward.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Completion rule checked before leaving a step forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRule {
    Always,
    PrimaryUseSelected,
    SecondaryUsesComplete,
    DocumentsPresent,
    AnalysisComplete,
    AmbiguitiesResolved,
}

/// Work the workflow performs when a step is entered going forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEffect {
    /// start-verification, classify, apply-normative, analyze
    RunAnalysis,
    StartAmbiguitySession,
    GenerateChecklist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub title: String,
    pub rule: StepRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_enter: Option<StepEffect>,
}

impl StepDefinition {
    pub fn new(title: &str, rule: StepRule, on_enter: Option<StepEffect>) -> Self {
        Self {
            title: title.to_string(),
            rule,
            on_enter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Workflow definition has no steps")]
    Empty,
    #[error("Effect {effect:?} appears more than once")]
    DuplicateEffect { effect: StepEffect },
    #[error("Effect {effect:?} on step {step} comes before the analysis step")]
    EffectBeforeAnalysis { effect: StepEffect, step: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub steps: Vec<StepDefinition>,
}

impl Default for WorkflowDefinition {
    fn default() -> Self {
        Self {
            steps: vec![
                StepDefinition::new("Tipo de edificio", StepRule::Always, None),
                StepDefinition::new("Uso principal", StepRule::PrimaryUseSelected, None),
                StepDefinition::new("Usos secundarios", StepRule::SecondaryUsesComplete, None),
                StepDefinition::new("Documentación", StepRule::DocumentsPresent, None),
                StepDefinition::new(
                    "Análisis",
                    StepRule::AnalysisComplete,
                    Some(StepEffect::RunAnalysis),
                ),
                StepDefinition::new(
                    "Resolución de ambigüedades",
                    StepRule::AmbiguitiesResolved,
                    Some(StepEffect::StartAmbiguitySession),
                ),
                StepDefinition::new(
                    "Checklist final",
                    StepRule::Always,
                    Some(StepEffect::GenerateChecklist),
                ),
            ],
        }
    }
}

impl WorkflowDefinition {
    pub fn max_steps(&self) -> usize {
        self.steps.len()
    }

    /// Step `n`, 1-based.
    pub fn step(&self, n: usize) -> Option<&StepDefinition> {
        n.checked_sub(1).and_then(|index| self.steps.get(index))
    }

    pub fn step_with_effect(&self, effect: StepEffect) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| step.on_enter == Some(effect))
            .map(|index| index + 1)
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.steps.is_empty() {
            return Err(DefinitionError::Empty);
        }

        let mut seen = Vec::new();
        for step in &self.steps {
            if let Some(effect) = step.on_enter {
                if seen.contains(&effect) {
                    return Err(DefinitionError::DuplicateEffect { effect });
                }
                seen.push(effect);
            }
        }

        // Later effects read the analysis results
        if let Some(analysis_step) = self.step_with_effect(StepEffect::RunAnalysis) {
            for effect in [StepEffect::StartAmbiguitySession, StepEffect::GenerateChecklist] {
                if let Some(step) = self.step_with_effect(effect) {
                    if step < analysis_step {
                        return Err(DefinitionError::EffectBeforeAnalysis { effect, step });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_definition_has_seven_steps() {
        let definition = WorkflowDefinition::default();
        assert_eq!(definition.max_steps(), 7);
        assert!(definition.validate().is_ok());
        assert_eq!(definition.step_with_effect(StepEffect::RunAnalysis), Some(5));
        assert_eq!(definition.step_with_effect(StepEffect::StartAmbiguitySession), Some(6));
        assert_eq!(definition.step(7).map(|s| s.rule), Some(StepRule::Always));
        assert!(definition.step(0).is_none());
        assert!(definition.step(8).is_none());
    }

    #[test]
    fn test_definition_loads_from_toml() {
        let definition: WorkflowDefinition = toml::from_str(
            r#"
            [[steps]]
            title = "Uso principal"
            rule = "primary_use_selected"

            [[steps]]
            title = "Documentación"
            rule = "documents_present"

            [[steps]]
            title = "Análisis"
            rule = "analysis_complete"
            on_enter = "run_analysis"
            "#,
        )
        .unwrap();

        assert_eq!(definition.max_steps(), 3);
        assert_eq!(definition.step(3).unwrap().on_enter, Some(StepEffect::RunAnalysis));
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn test_invalid_definitions_are_rejected() {
        assert_eq!(
            WorkflowDefinition { steps: vec![] }.validate(),
            Err(DefinitionError::Empty)
        );

        let checklist_first = WorkflowDefinition {
            steps: vec![
                StepDefinition::new("Checklist", StepRule::Always, Some(StepEffect::GenerateChecklist)),
                StepDefinition::new("Análisis", StepRule::AnalysisComplete, Some(StepEffect::RunAnalysis)),
            ],
        };
        assert!(matches!(
            checklist_first.validate(),
            Err(DefinitionError::EffectBeforeAnalysis { step: 1, .. })
        ));
    }
}
