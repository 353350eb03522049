use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::definition::{StepEffect, StepRule, WorkflowDefinition};
use super::validator::{validation_error, ValidationErrorKind};
use crate::draft::ProjectDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "step", rename_all = "snake_case")]
pub enum WizardMode {
    /// 1-based step
    Step(usize),
    /// Every step shown at once
    Overview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Back,
    Forward,
}

impl Direction {
    pub fn from_delta(delta: i32) -> Option<Self> {
        match delta {
            -1 => Some(Direction::Back),
            1 => Some(Direction::Forward),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    AtFirstStep,
    AtLastStep,
    OverviewMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTransition {
    pub from: usize,
    pub to: usize,
    pub direction: Direction,
    /// Effect of the entered step; only reported when moving forward
    pub effect: Option<StepEffect>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationOutcome {
    Moved(StepTransition),
    Unchanged(Boundary),
}

/// Owns the current step and gates forward navigation on the draft.
#[derive(Debug, Clone)]
pub struct WizardController {
    definition: WorkflowDefinition,
    mode: WizardMode,
    /// Step to return to when leaving overview mode
    resume_step: usize,
    history: Vec<StepTransition>,
}

impl WizardController {
    pub fn new(definition: WorkflowDefinition) -> Self {
        Self {
            definition,
            mode: WizardMode::Step(1),
            resume_step: 1,
            history: Vec::new(),
        }
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    pub fn mode(&self) -> WizardMode {
        self.mode
    }

    pub fn current_step(&self) -> Option<usize> {
        match self.mode {
            WizardMode::Step(n) => Some(n),
            WizardMode::Overview => None,
        }
    }

    pub fn max_steps(&self) -> usize {
        self.definition.max_steps().max(1)
    }

    pub fn history(&self) -> &[StepTransition] {
        &self.history
    }

    fn clamp(&self, step: usize) -> usize {
        step.clamp(1, self.max_steps())
    }

    fn rule_for(&self, step: usize) -> StepRule {
        self.definition
            .step(step)
            .map(|s| s.rule)
            .unwrap_or(StepRule::Always)
    }

    /// Why forward navigation from the current step is blocked, if it is.
    pub fn forward_blocker(&self, draft: &ProjectDraft) -> Option<ValidationErrorKind> {
        self.current_step()
            .and_then(|step| validation_error(self.rule_for(step), draft))
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.mode, WizardMode::Step(n) if n > 1)
    }

    pub fn can_go_forward(&self, draft: &ProjectDraft) -> bool {
        matches!(self.mode, WizardMode::Step(n) if n < self.max_steps())
            && self.forward_blocker(draft).is_none()
    }

    /// Move one step. Back is never validated; forward requires the current step to be
    /// complete. A validation failure leaves the step unchanged.
    pub fn change_step(
        &mut self,
        direction: Direction,
        draft: &ProjectDraft,
    ) -> Result<NavigationOutcome, ValidationErrorKind> {
        let WizardMode::Step(current) = self.mode else {
            return Ok(NavigationOutcome::Unchanged(Boundary::OverviewMode));
        };

        let target = match direction {
            Direction::Back if current <= 1 => {
                return Ok(NavigationOutcome::Unchanged(Boundary::AtFirstStep));
            }
            Direction::Back => current - 1,
            Direction::Forward if current >= self.max_steps() => {
                return Ok(NavigationOutcome::Unchanged(Boundary::AtLastStep));
            }
            Direction::Forward => {
                if let Some(kind) = validation_error(self.rule_for(current), draft) {
                    debug!(step = current, ?kind, "Forward navigation blocked");
                    return Err(kind);
                }
                current + 1
            }
        };

        let effect = match direction {
            Direction::Forward => self.definition.step(target).and_then(|s| s.on_enter),
            Direction::Back => None,
        };

        let transition = StepTransition {
            from: current,
            to: target,
            direction,
            effect,
            timestamp: Utc::now(),
        };
        info!(
            from = transition.from,
            to = transition.to,
            direction = ?transition.direction,
            effect = ?transition.effect,
            "Wizard step changed"
        );

        self.mode = WizardMode::Step(target);
        self.resume_step = target;
        self.history.push(transition.clone());
        Ok(NavigationOutcome::Moved(transition))
    }

    pub fn enter_overview(&mut self) {
        if let WizardMode::Step(n) = self.mode {
            self.resume_step = n;
        }
        self.mode = WizardMode::Overview;
    }

    pub fn leave_overview(&mut self) {
        if self.mode == WizardMode::Overview {
            self.mode = WizardMode::Step(self.clamp(self.resume_step));
        }
    }

    /// Restore a mode from a snapshot, clamping steps the definition does not have.
    pub fn restore_mode(&mut self, mode: WizardMode) {
        self.mode = match mode {
            WizardMode::Step(n) => {
                let step = self.clamp(n);
                self.resume_step = step;
                WizardMode::Step(step)
            }
            WizardMode::Overview => WizardMode::Overview,
        };
    }

    /// Swap the step layout, keeping the current position when it still exists.
    pub fn replace_definition(&mut self, definition: WorkflowDefinition) {
        self.definition = definition;
        self.resume_step = self.clamp(self.resume_step);
        if let WizardMode::Step(n) = self.mode {
            self.mode = WizardMode::Step(self.clamp(n));
        }
    }

    /// `(step - 1) / (max_steps - 1)`, 1.0 in overview mode and for single-step layouts.
    pub fn progress(&self) -> f64 {
        let max = self.max_steps();
        match self.mode {
            WizardMode::Overview => 1.0,
            WizardMode::Step(_) if max <= 1 => 1.0,
            WizardMode::Step(n) => ((n as f64 - 1.0) / (max as f64 - 1.0)).clamp(0.0, 1.0),
        }
    }

    pub fn visible_steps(&self) -> Vec<usize> {
        match self.mode {
            WizardMode::Overview => (1..=self.max_steps()).collect(),
            WizardMode::Step(n) => vec![n],
        }
    }

    pub fn reset(&mut self) {
        self.mode = WizardMode::Step(1);
        self.resume_step = 1;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{DocumentKind, FileRef, UseType};
    use crate::wizard::definition::StepDefinition;

    fn controller() -> WizardController {
        WizardController::new(WorkflowDefinition::default())
    }

    #[test]
    fn test_back_from_first_step_is_a_no_op() {
        let mut wizard = controller();
        let outcome = wizard
            .change_step(Direction::Back, &ProjectDraft::new())
            .unwrap();
        assert_eq!(outcome, NavigationOutcome::Unchanged(Boundary::AtFirstStep));
        assert_eq!(wizard.mode(), WizardMode::Step(1));
        assert!(wizard.history().is_empty());
    }

    #[test]
    fn test_forward_without_primary_use_stays_on_step_two() {
        let mut wizard = controller();
        let draft = ProjectDraft::new();
        wizard.change_step(Direction::Forward, &draft).unwrap();

        let err = wizard.change_step(Direction::Forward, &draft).unwrap_err();
        assert_eq!(err, ValidationErrorKind::MissingPrimaryUse);
        assert_eq!(wizard.current_step(), Some(2));
        assert_eq!(wizard.forward_blocker(&draft), Some(ValidationErrorKind::MissingPrimaryUse));
        assert!(!wizard.can_go_forward(&draft));
    }

    #[test]
    fn test_back_is_never_validated() {
        let mut wizard = controller();
        let mut draft = ProjectDraft::new();
        draft.set_primary_use(Some(UseType::Industrial));
        wizard.change_step(Direction::Forward, &draft).unwrap();
        wizard.change_step(Direction::Forward, &draft).unwrap();

        draft.set_primary_use(None);
        let outcome = wizard.change_step(Direction::Back, &draft).unwrap();
        assert!(matches!(
            outcome,
            NavigationOutcome::Moved(StepTransition { from: 3, to: 2, effect: None, .. })
        ));
    }

    #[test]
    fn test_forward_into_analysis_reports_effect() {
        let mut wizard = controller();
        wizard.restore_mode(WizardMode::Step(4));
        let mut draft = ProjectDraft::new();
        draft
            .set_documents(DocumentKind::Memoria, vec![FileRef::pdf("m.pdf", 1)])
            .unwrap();
        draft
            .set_documents(DocumentKind::Planos, vec![FileRef::pdf("p.pdf", 1)])
            .unwrap();

        let outcome = wizard.change_step(Direction::Forward, &draft).unwrap();
        match outcome {
            NavigationOutcome::Moved(transition) => {
                assert_eq!(transition.to, 5);
                assert_eq!(transition.effect, Some(StepEffect::RunAnalysis));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(wizard.history().len(), 1);
    }

    #[test]
    fn test_last_step_is_terminal() {
        let mut wizard = controller();
        wizard.restore_mode(WizardMode::Step(7));
        let outcome = wizard
            .change_step(Direction::Forward, &ProjectDraft::new())
            .unwrap();
        assert_eq!(outcome, NavigationOutcome::Unchanged(Boundary::AtLastStep));
        assert_eq!(wizard.progress(), 1.0);
    }

    #[test]
    fn test_overview_mode_rejects_navigation() {
        let mut wizard = controller();
        wizard.restore_mode(WizardMode::Step(3));
        wizard.enter_overview();

        assert_eq!(wizard.visible_steps(), (1..=7).collect::<Vec<_>>());
        assert_eq!(wizard.progress(), 1.0);
        assert_eq!(
            wizard.change_step(Direction::Back, &ProjectDraft::new()),
            Ok(NavigationOutcome::Unchanged(Boundary::OverviewMode))
        );

        wizard.leave_overview();
        assert_eq!(wizard.mode(), WizardMode::Step(3));
        assert_eq!(wizard.visible_steps(), vec![3]);
    }

    #[test]
    fn test_progress_and_clamping() {
        let mut wizard = controller();
        assert_eq!(wizard.progress(), 0.0);
        wizard.restore_mode(WizardMode::Step(4));
        assert!((wizard.progress() - 0.5).abs() < f64::EPSILON);

        wizard.restore_mode(WizardMode::Step(0));
        assert_eq!(wizard.mode(), WizardMode::Step(1));
        wizard.restore_mode(WizardMode::Step(42));
        assert_eq!(wizard.mode(), WizardMode::Step(7));

        wizard.replace_definition(WorkflowDefinition {
            steps: vec![StepDefinition::new("Único", StepRule::Always, None)],
        });
        assert_eq!(wizard.mode(), WizardMode::Step(1));
        assert_eq!(wizard.progress(), 1.0);
    }

    #[test]
    fn test_direction_from_delta() {
        assert_eq!(Direction::from_delta(-1), Some(Direction::Back));
        assert_eq!(Direction::from_delta(1), Some(Direction::Forward));
        assert_eq!(Direction::from_delta(2), None);
    }
}
