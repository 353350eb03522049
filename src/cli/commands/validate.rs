use anyhow::{bail, Result};
use std::path::PathBuf;

use super::project::ProjectSpec;
use crate::draft::{DocumentKind, ProjectDraft};
use crate::wizard::{validation_error, StepRule, ValidationErrorKind, WorkflowDefinition};
use crate::workflow::notifications::{describe_selection, describe_validation};

/// Result of checking one step offline.
#[derive(Debug, Clone, PartialEq)]
pub enum StepCheck {
    Complete,
    Incomplete(ValidationErrorKind),
    /// Depends on backend results
    Deferred,
}

pub struct ValidateCommand {
    project: PathBuf,
    definition: WorkflowDefinition,
}

impl ValidateCommand {
    pub fn new(project: PathBuf, definition: WorkflowDefinition) -> Self {
        Self {
            project,
            definition,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        println!("🔎 Validating {}", self.project.display());
        println!();

        let spec = ProjectSpec::load(&self.project)?;
        let mut draft = spec.to_draft()?;
        let (memoria, planos) = spec.document_files(None, &[])?;
        for (kind, files) in [(DocumentKind::Memoria, memoria), (DocumentKind::Planos, planos)] {
            if files.is_empty() {
                continue;
            }
            match draft.set_documents(kind, files) {
                Ok(selection) if selection.has_rejections() => {
                    println!("⚠️  {}", describe_selection(&selection));
                }
                Ok(_) => {}
                Err(e) => println!("⚠️  {kind}: {e}"),
            }
        }

        let checks = self.check(&draft);
        let mut incomplete = 0;
        for (index, (title, check)) in checks.iter().enumerate() {
            match check {
                StepCheck::Complete => println!("✅ {}. {}", index + 1, title),
                StepCheck::Deferred => println!("⏳ {}. {} (needs the backend)", index + 1, title),
                StepCheck::Incomplete(kind) => {
                    incomplete += 1;
                    println!("❌ {}. {}: {}", index + 1, title, describe_validation(kind));
                }
            }
        }
        println!();

        if incomplete > 0 {
            bail!("{incomplete} step(s) incomplete");
        }
        println!("🎉 Project is ready to run");
        Ok(())
    }

    pub fn check(&self, draft: &ProjectDraft) -> Vec<(String, StepCheck)> {
        self.definition
            .steps
            .iter()
            .map(|step| {
                let check = match step.rule {
                    StepRule::AnalysisComplete | StepRule::AmbiguitiesResolved => {
                        StepCheck::Deferred
                    }
                    rule => match validation_error(rule, draft) {
                        Some(kind) => StepCheck::Incomplete(kind),
                        None => StepCheck::Complete,
                    },
                };
                (step.title.clone(), check)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{FileRef, UseType};

    #[test]
    fn test_checks_for_partial_draft() {
        let command = ValidateCommand::new(PathBuf::from("project.toml"), WorkflowDefinition::default());
        let mut draft = ProjectDraft::new();
        draft.set_primary_use(Some(UseType::ServiciosTerciarios));
        draft
            .set_documents(DocumentKind::Memoria, vec![FileRef::pdf("memoria.pdf", 1)])
            .unwrap();

        let checks: Vec<StepCheck> = command.check(&draft).into_iter().map(|(_, c)| c).collect();
        assert_eq!(
            checks,
            vec![
                StepCheck::Complete,
                StepCheck::Complete,
                StepCheck::Complete,
                StepCheck::Incomplete(ValidationErrorKind::MissingPlanos),
                StepCheck::Deferred,
                StepCheck::Deferred,
                StepCheck::Complete,
            ]
        );
    }
}
