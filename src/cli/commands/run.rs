use anyhow::{anyhow, bail, Context, Result};
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use super::project::ProjectSpec;
use crate::backend::{HttpBackend, VerificationBackend};
use crate::config::WizardConfig;
use crate::draft::DocumentKind;
use crate::presenter::ResultsSummary;
use crate::resolution::Speaker;
use crate::wizard::{Boundary, Direction, NavigationOutcome, WizardMode};
use crate::workflow::{NotificationLevel, VerificationWorkflow, WorkflowError, WorkflowSettings};

/// Where ambiguity-session answers come from.
pub enum AnswerSource {
    Scripted(VecDeque<String>),
    Interactive(Lines<BufReader<Stdin>>),
}

impl AnswerSource {
    /// One answer per non-blank line.
    pub fn from_script(content: &str) -> Self {
        AnswerSource::Scripted(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn stdin() -> Self {
        AnswerSource::Interactive(BufReader::new(tokio::io::stdin()).lines())
    }

    pub async fn next_answer(&mut self) -> Result<Option<String>> {
        match self {
            AnswerSource::Scripted(answers) => Ok(answers.pop_front()),
            AnswerSource::Interactive(lines) => loop {
                print!("✍️  > ");
                std::io::stdout().flush()?;
                match lines.next_line().await? {
                    Some(line) if line.trim().is_empty() => continue,
                    other => return Ok(other),
                }
            },
        }
    }
}

pub struct RunCommand {
    pub config: WizardConfig,
    pub project: PathBuf,
    pub memoria: Option<PathBuf>,
    pub planos: Vec<PathBuf>,
    pub answers: Option<PathBuf>,
    pub export: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub json: bool,
}

impl RunCommand {
    pub fn new(config: WizardConfig, project: PathBuf) -> Self {
        Self {
            config,
            project,
            memoria: None,
            planos: Vec::new(),
            answers: None,
            export: None,
            report: None,
            json: false,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let backend = HttpBackend::new(&self.config.backend)?;
        println!("🔗 Verification backend: {}", backend.base_url());
        let summary = self.execute_with(Arc::new(backend)).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }
        Ok(())
    }

    /// Drive the workflow from the project file to the final checklist.
    pub async fn execute_with(&self, backend: Arc<dyn VerificationBackend>) -> Result<ResultsSummary> {
        let spec = ProjectSpec::load(&self.project)?;
        let draft = spec.to_draft()?;
        let (memoria, planos) = spec.document_files(self.memoria.as_deref(), &self.planos)?;

        let workflow = VerificationWorkflow::new(
            self.config.workflow.definition_or_default(),
            backend,
            WorkflowSettings::from(&self.config),
        )?;
        workflow.restore(draft, WizardMode::Step(1)).await?;
        for (kind, files) in [(DocumentKind::Memoria, memoria), (DocumentKind::Planos, planos)] {
            if !files.is_empty() {
                workflow.set_documents(kind, files).await?;
            }
        }

        let mut answers = match &self.answers {
            Some(path) => AnswerSource::from_script(
                &std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read answers file {}", path.display()))?,
            ),
            None => AnswerSource::stdin(),
        };

        self.drive(&workflow, &mut answers).await?;

        if let Some(path) = &self.report {
            let report = workflow
                .generate_report()
                .await
                .map_err(|e| failure(&e))?;
            write_file(path, &serde_json::to_vec_pretty(&report)?)?;
            println!("📝 Report written to {}", path.display());
        }
        if let Some(path) = &self.export {
            let export = workflow
                .export_checklist()
                .await
                .map_err(|e| failure(&e))?;
            write_file(path, &export.body)?;
            println!("📦 Export ({}) written to {}", export.content_type, path.display());
        }

        workflow.log_metrics();
        workflow
            .snapshot()
            .await
            .results
            .ok_or_else(|| anyhow!("Workflow finished without a final checklist"))
    }

    async fn drive(&self, workflow: &VerificationWorkflow, answers: &mut AnswerSource) -> Result<()> {
        let mut printed = 0;
        loop {
            let snapshot = workflow.snapshot().await;
            for notification in &snapshot.notifications {
                if notification.level != NotificationLevel::Info {
                    println!("⚠️  {}", notification.message);
                }
                workflow.dismiss_notification(notification.id).await;
            }

            for entry in snapshot.session.transcript.iter().skip(printed) {
                if entry.speaker == Speaker::System {
                    println!("🤖 {}", entry.text);
                }
            }
            printed = snapshot.session.transcript.len();

            if snapshot.session.accepts_turns {
                for action in &snapshot.session.suggested_actions {
                    println!("   • {}", action.label);
                }
                let Some(answer) = answers.next_answer().await? else {
                    bail!("Ambiguity session still open but no answers are left");
                };
                println!("🙋 {answer}");
                workflow.send_turn(&answer).await.map_err(|e| failure(&e))?;
                continue;
            }

            match workflow
                .change_step(Direction::Forward)
                .await
                .map_err(|e| failure(&e))?
            {
                NavigationOutcome::Moved(transition) => {
                    let title = workflow.snapshot().await.step_title.unwrap_or_default();
                    info!(step = transition.to, "Advanced");
                    println!("➡️  {}. {}", transition.to, title);
                }
                NavigationOutcome::Unchanged(Boundary::AtLastStep) => return Ok(()),
                NavigationOutcome::Unchanged(boundary) => {
                    bail!("Cannot advance: {boundary:?}")
                }
            }
        }
    }
}

fn failure(error: &WorkflowError) -> anyhow::Error {
    anyhow!("❌ {}", crate::workflow::notifications::describe_error(error))
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_summary(summary: &ResultsSummary) {
    println!();
    println!("📊 RESULTS");
    println!("==========");
    println!(
        "   Completion: {:.1}% ({})",
        summary.completion_percentage,
        summary.status.label()
    );
    println!(
        "   Items: {}/{} completed, {} pending, {} critical",
        summary.completed_items, summary.total_items, summary.pending_items, summary.critical_items
    );
    if !summary.categories.is_empty() {
        println!();
        for category in &summary.categories {
            println!(
                "   {:<40} {:>5.1}%  {}/{}  {}",
                category.name,
                category.completion_percentage,
                category.completed_items,
                category.total_items,
                category.status.label()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_answers_skip_blank_lines() {
        let mut answers = AnswerSource::from_script("sótano 1\n\n  planta baja  \n");
        assert_eq!(answers.next_answer().await.unwrap().as_deref(), Some("sótano 1"));
        assert_eq!(answers.next_answer().await.unwrap().as_deref(), Some("planta baja"));
        assert_eq!(answers.next_answer().await.unwrap(), None);
    }
}
