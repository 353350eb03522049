use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn, Instrument};

use super::errors::{Precondition, WorkflowError};
use super::events::{EventBus, WorkflowEvent};
use super::notifications::{describe_selection, NotificationKind, NotificationLevel};
use super::{
    NavigationAffordances, NotificationCenter, TaskSnapshot, WorkflowSettings, WorkflowSnapshot,
};
use crate::backend::types::{
    AnalyzeRequest, ApplyNormativeRequest, ChatbotMessageRequest, ChatbotStartRequest,
    ChecklistRequest, ClassifyRequest, ExportPayload, FinalChecklist, FinalReport, ProjectData,
    ReportRequest, StartVerificationRequest, ValidatePayload,
};
use crate::backend::{BackendError, VerificationBackend};
use crate::draft::{
    DocumentKind, DocumentSelection, DraftError, FileRef, FloorLevel, ProjectDraft, RangeKind,
    UseType,
};
use crate::observability::{OperationTimer, WorkflowMetrics, WorkflowStats};
use crate::presenter::summarize;
use crate::resolution::{AmbiguityResolutionEngine, SessionError, StartDecision};
use crate::tasks::{AsyncTaskError, TaskBoard, TaskName, TaskTicket};
use crate::telemetry::create_task_span;
use crate::wizard::{
    DefinitionError, Direction, NavigationOutcome, StepEffect, StepTransition, WizardController,
    WizardMode, WorkflowDefinition,
};

/// State guarded by the workflow lock. The lock is never held across a backend call.
#[derive(Debug)]
struct WorkflowState {
    draft: ProjectDraft,
    wizard: WizardController,
    tasks: TaskBoard,
    session: AmbiguityResolutionEngine,
    notifications: NotificationCenter,
}

type FailureHook = fn(&mut WorkflowState, &AsyncTaskError);

/// Orchestrates one verification at a time against an injected backend.
pub struct VerificationWorkflow {
    state: Mutex<WorkflowState>,
    backend: Arc<dyn VerificationBackend>,
    events: EventBus,
    metrics: WorkflowMetrics,
    settings: WorkflowSettings,
}

impl VerificationWorkflow {
    pub fn new(
        definition: WorkflowDefinition,
        backend: Arc<dyn VerificationBackend>,
        settings: WorkflowSettings,
    ) -> Result<Self, DefinitionError> {
        definition.validate()?;

        let state = WorkflowState {
            draft: ProjectDraft::new(),
            wizard: WizardController::new(definition),
            tasks: TaskBoard::new(),
            session: AmbiguityResolutionEngine::new(),
            notifications: NotificationCenter::new(
                settings.notification_ttl,
                settings.max_notifications,
            ),
        };

        Ok(Self {
            state: Mutex::new(state),
            backend,
            events: EventBus::new(settings.event_capacity),
            metrics: WorkflowMetrics::new(),
            settings,
        })
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> WorkflowStats {
        self.metrics.get_stats()
    }

    pub fn log_metrics(&self) {
        self.metrics.log_stats();
    }

    fn notify_error(&self, state: &mut WorkflowState, error: &WorkflowError) {
        if !error.is_user_visible() {
            debug!(%error, "Error not surfaced to the user");
            return;
        }
        warn!(kind = ?error.kind(), %error, "Workflow operation failed");
        let notification = state.notifications.push_error(error);
        self.events.publish(WorkflowEvent::Notified { notification });
    }

    fn notify(
        &self,
        state: &mut WorkflowState,
        level: NotificationLevel,
        kind: NotificationKind,
        message: String,
    ) {
        let notification = state.notifications.push(level, kind, message);
        self.events.publish(WorkflowEvent::Notified { notification });
    }

    // Draft mutations

    async fn mutate_draft<T>(
        &self,
        mutation: impl FnOnce(&mut ProjectDraft) -> Result<T, DraftError>,
    ) -> Result<T, WorkflowError> {
        let mut state = self.state.lock().await;
        match mutation(&mut state.draft) {
            Ok(value) => {
                debug_assert!(state.draft.invariants_hold());
                self.events.publish(WorkflowEvent::DraftChanged);
                Ok(value)
            }
            Err(error) => {
                let error = WorkflowError::from(error);
                self.notify_error(&mut state, &error);
                Err(error)
            }
        }
    }

    /// Edits that cannot fail; every call publishes `DraftChanged`.
    async fn update_draft(&self, update: impl FnOnce(&mut ProjectDraft)) {
        let mut state = self.state.lock().await;
        update(&mut state.draft);
        debug_assert!(state.draft.invariants_hold());
        self.events.publish(WorkflowEvent::DraftChanged);
    }

    pub async fn set_building_type(&self, is_existing_building: bool) {
        self.update_draft(|draft| draft.set_building_type(is_existing_building))
            .await;
    }

    pub async fn set_primary_use(&self, use_type: Option<UseType>) {
        self.update_draft(|draft| draft.set_primary_use(use_type))
            .await;
    }

    pub async fn set_secondary_uses_enabled(&self, enabled: bool) {
        self.update_draft(|draft| draft.set_secondary_uses_enabled(enabled))
            .await;
    }

    pub async fn add_secondary_use(&self, use_type: UseType) -> Result<(), WorkflowError> {
        self.mutate_draft(|draft| draft.add_secondary_use(use_type))
            .await
    }

    pub async fn remove_secondary_use(&self, use_type: UseType) -> Result<(), WorkflowError> {
        self.mutate_draft(|draft| draft.remove_secondary_use(use_type))
            .await
    }

    pub async fn set_floors_for_use(
        &self,
        use_type: UseType,
        floors: Vec<FloorLevel>,
    ) -> Result<(), WorkflowError> {
        self.mutate_draft(|draft| draft.set_floors_for_use(use_type, floors))
            .await
    }

    pub async fn add_floor_range(
        &self,
        use_type: UseType,
        kind: RangeKind,
        from: i32,
        to: i32,
    ) -> Result<(), WorkflowError> {
        self.mutate_draft(|draft| draft.add_floor_range(use_type, kind, from, to))
            .await
    }

    pub async fn add_special_floor(
        &self,
        use_type: UseType,
        level: FloorLevel,
    ) -> Result<(), WorkflowError> {
        self.mutate_draft(|draft| draft.add_special_floor(use_type, level))
            .await
    }

    pub async fn remove_floor(&self, use_type: UseType, level: FloorLevel) -> Result<(), WorkflowError> {
        self.mutate_draft(|draft| draft.remove_floor(use_type, level))
            .await
    }

    /// Select the files of one document slot; rejected entries raise a warning.
    pub async fn set_documents(
        &self,
        kind: DocumentKind,
        files: Vec<FileRef>,
    ) -> Result<DocumentSelection, WorkflowError> {
        let selection = self
            .mutate_draft(|draft| draft.set_documents(kind, files))
            .await?;
        if selection.has_rejections() {
            let mut state = self.state.lock().await;
            self.notify(
                &mut state,
                NotificationLevel::Warning,
                NotificationKind::PartialSelection,
                describe_selection(&selection),
            );
        }
        Ok(selection)
    }

    pub async fn remove_document(&self, kind: DocumentKind, index: usize) -> Result<FileRef, WorkflowError> {
        self.mutate_draft(|draft| draft.remove_document(kind, index))
            .await
    }

    /// Replace the draft and position, e.g. from a saved snapshot. Out-of-range steps are
    /// clamped to the definition.
    pub async fn restore(&self, draft: ProjectDraft, mode: WizardMode) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        if let Err(error) = state.draft.restore_from(draft) {
            let error = WorkflowError::from(error);
            self.notify_error(&mut state, &error);
            return Err(error);
        }
        state.tasks.reset();
        state.session = AmbiguityResolutionEngine::new();
        state.wizard.restore_mode(mode);
        info!(mode = ?state.wizard.mode(), job_id = ?state.draft.job_id(), "Workflow restored");
        self.events.publish(WorkflowEvent::DraftChanged);
        Ok(())
    }

    /// Discard everything and start over at step 1. Responses still in flight are dropped
    /// when they arrive.
    pub async fn new_verification(&self) {
        let mut state = self.state.lock().await;
        state.draft.reset();
        state.wizard.reset();
        state.tasks.reset();
        state.session = AmbiguityResolutionEngine::new();
        state.notifications.clear();
        info!(generation = state.draft.generation(), "Started a new verification");
        self.events.publish(WorkflowEvent::WorkflowReset);
    }

    // Navigation

    pub async fn change_step(&self, direction: Direction) -> Result<NavigationOutcome, WorkflowError> {
        let outcome = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let from = state.wizard.mode();
            match state.wizard.change_step(direction, &state.draft) {
                Ok(outcome) => {
                    if let NavigationOutcome::Moved(_) = &outcome {
                        self.events.publish(WorkflowEvent::StepChanged {
                            from,
                            to: state.wizard.mode(),
                        });
                    }
                    outcome
                }
                Err(kind) => {
                    let error = WorkflowError::Validation(kind);
                    self.notify_error(state, &error);
                    return Err(error);
                }
            }
        };

        if let NavigationOutcome::Moved(StepTransition {
            effect: Some(effect),
            ..
        }) = &outcome
        {
            // Failures are already surfaced as notifications; the move itself stands
            if let Err(error) = self.run_effect(*effect).await {
                warn!(?effect, %error, "Step effect did not complete");
            }
        }

        Ok(outcome)
    }

    pub async fn enter_overview(&self) {
        let mut state = self.state.lock().await;
        let from = state.wizard.mode();
        state.wizard.enter_overview();
        self.events.publish(WorkflowEvent::StepChanged {
            from,
            to: state.wizard.mode(),
        });
    }

    pub async fn leave_overview(&self) {
        let mut state = self.state.lock().await;
        let from = state.wizard.mode();
        state.wizard.leave_overview();
        self.events.publish(WorkflowEvent::StepChanged {
            from,
            to: state.wizard.mode(),
        });
    }

    pub async fn dismiss_notification(&self, id: u64) -> bool {
        self.state.lock().await.notifications.dismiss(id)
    }

    async fn run_effect(&self, effect: StepEffect) -> Result<(), WorkflowError> {
        match effect {
            StepEffect::RunAnalysis => self.run_analysis().await,
            StepEffect::StartAmbiguitySession => {
                let needed = {
                    let state = self.state.lock().await;
                    state.draft.resolution().is_none()
                        && state
                            .draft
                            .analysis_results()
                            .is_some_and(|results| results.has_ambiguities())
                };
                if needed {
                    self.start_ambiguity_session().await?;
                }
                Ok(())
            }
            StepEffect::GenerateChecklist => {
                let needed = self.state.lock().await.draft.final_checklist().is_none();
                if needed {
                    self.generate_checklist().await?;
                }
                Ok(())
            }
        }
    }

    // Backend tasks

    /// Run one backend call through the task lifecycle.
    ///
    /// `prepare` runs under the lock once the task is pending and builds the request;
    /// `apply` runs under the lock with the validated response, after the ticket has been
    /// checked against the current draft.
    async fn run_task<Req, Resp, Out, Fut, Call, Apply>(
        &self,
        name: TaskName,
        prepare: impl FnOnce(&mut WorkflowState) -> Result<Req, WorkflowError>,
        call: Call,
        apply: Apply,
        on_failure: Option<FailureHook>,
    ) -> Result<Out, WorkflowError>
    where
        Call: FnOnce(Arc<dyn VerificationBackend>, Req) -> Fut,
        Fut: Future<Output = Result<Resp, BackendError>>,
        Resp: ValidatePayload,
        Apply: FnOnce(&mut WorkflowState, Resp) -> Result<Out, WorkflowError>,
    {
        let (ticket, request) = {
            let mut state = self.state.lock().await;
            let generation = state.draft.generation();
            let job_id = state.draft.job_id().map(str::to_string);
            let session_id = match name {
                TaskName::ChatbotMessage => state.session.session_id().map(str::to_string),
                _ => None,
            };

            let ticket = match state.tasks.begin(name, generation, job_id, session_id) {
                Ok(ticket) => ticket,
                Err(concurrent) => {
                    self.metrics.record_concurrent_rejection();
                    let error = WorkflowError::from(concurrent);
                    self.notify_error(&mut state, &error);
                    return Err(error);
                }
            };

            match prepare(&mut *state) {
                Ok(request) => (ticket, request),
                Err(error) => {
                    state.tasks.abandon(&ticket);
                    self.notify_error(&mut state, &error);
                    return Err(error);
                }
            }
        };

        self.metrics.record_started();
        self.events.publish(WorkflowEvent::TaskStarted {
            task: name,
            correlation_id: ticket.correlation_id.clone(),
        });
        let span = create_task_span(
            name.as_str(),
            ticket.job_id.as_deref(),
            ticket.session_id.as_deref(),
            &ticket.correlation_id,
        );
        let timer = OperationTimer::new(name.as_str());

        let result = call(Arc::clone(&self.backend), request)
            .instrument(span)
            .await;

        let mut state = self.state.lock().await;
        if let Some(reason) = stale_reason(&state, &ticket) {
            timer.finish(false);
            state.tasks.abandon(&ticket);
            self.metrics.record_stale_discard();
            warn!(
                task = %name,
                correlation_id = %ticket.correlation_id,
                reason,
                "Discarding stale response"
            );
            return Err(WorkflowError::StaleSession { task: name });
        }

        let response = result
            .map_err(|error| AsyncTaskError::from_backend(name, error))
            .and_then(|response| {
                response
                    .validate()
                    .map(|()| response)
                    .map_err(|message| AsyncTaskError::decode(name, message))
            });

        match response {
            Ok(response) => match apply(&mut *state, response) {
                Ok(out) => {
                    state.tasks.succeed(&ticket);
                    self.metrics.record_succeeded();
                    timer.finish(true);
                    self.events.publish(WorkflowEvent::TaskCompleted { task: name });
                    Ok(out)
                }
                Err(error) => {
                    state
                        .tasks
                        .fail(&ticket, AsyncTaskError::decode(name, error.to_string()));
                    self.metrics.record_failed();
                    timer.finish(false);
                    self.notify_error(&mut state, &error);
                    Err(error)
                }
            },
            Err(task_error) => {
                if let Some(hook) = on_failure {
                    hook(&mut *state, &task_error);
                }
                state.tasks.fail(&ticket, task_error.clone());
                self.metrics.record_failed();
                timer.finish(false);
                self.events.publish(WorkflowEvent::TaskFailed {
                    error: task_error.clone(),
                });
                let error = WorkflowError::Task(task_error);
                self.notify_error(&mut state, &error);
                Err(error)
            }
        }
    }

    /// Start, classify, apply regulations and analyze, skipping whatever already succeeded.
    pub async fn run_analysis(&self) -> Result<(), WorkflowError> {
        let (has_job, has_classification, has_normative, has_analysis) = {
            let state = self.state.lock().await;
            (
                state.draft.job_id().is_some(),
                state.draft.classification().is_some(),
                state.draft.normative_application().is_some(),
                state.draft.analysis_results().is_some(),
            )
        };

        if !has_job {
            self.start_verification().await?;
        }
        if !has_classification {
            self.classify_documents().await?;
        }
        if !has_normative {
            self.apply_normative().await?;
        }
        if !has_analysis {
            self.analyze_documents().await?;
        }
        Ok(())
    }

    pub async fn start_verification(&self) -> Result<String, WorkflowError> {
        self.run_task(
            TaskName::StartVerification,
            |state| {
                let draft = &state.draft;
                if draft.job_id().is_some() {
                    return Err(Precondition::JobAlreadyStarted.into());
                }
                if draft.primary_use().is_none() {
                    return Err(Precondition::PrimaryUseMissing.into());
                }
                if draft.documents().memoria.is_empty() || draft.documents().planos.is_empty() {
                    return Err(Precondition::DocumentsMissing.into());
                }
                Ok(StartVerificationRequest {
                    project: ProjectData::from(draft),
                })
            },
            |backend, request| async move { backend.start_verification(&request).await },
            |state, response| {
                state.draft.assign_job_id(response.job_id.clone())?;
                info!(job_id = %response.job_id, status = %response.status, "Verification started");
                self.events.publish(WorkflowEvent::DraftChanged);
                Ok(response.job_id)
            },
            None,
        )
        .await
    }

    pub async fn classify_documents(&self) -> Result<(), WorkflowError> {
        self.run_task(
            TaskName::ClassifyDocuments,
            |state| {
                let draft = &state.draft;
                let job_id = draft.job_id().ok_or(Precondition::JobNotStarted)?;
                Ok(ClassifyRequest {
                    job_id: job_id.to_string(),
                    project: ProjectData::from(draft),
                    memoria: draft.documents().memoria.clone(),
                    planos: draft.documents().planos.clone(),
                })
            },
            |backend, request| async move { backend.classify_documents(&request).await },
            |state, classification| {
                let summary = classification.summary();
                info!(
                    memoria = summary.memoria_count,
                    planos = summary.plano_count,
                    average_confidence = summary.average_confidence,
                    "Documents classified"
                );
                state.draft.set_classification(classification);
                self.events.publish(WorkflowEvent::DraftChanged);
                Ok(())
            },
            None,
        )
        .await
    }

    pub async fn apply_normative(&self) -> Result<(), WorkflowError> {
        self.run_task(
            TaskName::ApplyNormative,
            |state| {
                let draft = &state.draft;
                let job_id = draft.job_id().ok_or(Precondition::JobNotStarted)?;
                let primary_use = draft.primary_use().ok_or(Precondition::PrimaryUseMissing)?;
                Ok(ApplyNormativeRequest {
                    project_id: job_id.to_string(),
                    primary_use,
                    secondary_uses: draft.secondary_uses().to_vec(),
                    is_existing_building: draft.is_existing_building(),
                    document_names: draft.documents().names(),
                })
            },
            |backend, request| async move { backend.apply_normative(&request).await },
            |state, application| {
                debug!(
                    documents = application.applicable_documents.len(),
                    "Normative applied"
                );
                state.draft.set_normative_application(application);
                self.events.publish(WorkflowEvent::DraftChanged);
                Ok(())
            },
            None,
        )
        .await
    }

    pub async fn analyze_documents(&self) -> Result<(), WorkflowError> {
        self.run_task(
            TaskName::AnalyzeDocuments,
            |state| {
                let draft = &state.draft;
                draft.job_id().ok_or(Precondition::JobNotStarted)?;
                Ok(AnalyzeRequest {
                    project_data: ProjectData::from(draft),
                    files: draft.documents().clone(),
                })
            },
            |backend, request| async move { backend.analyze_documents(&request).await },
            |state, results| {
                info!(
                    documents_analyzed = results.documents_analyzed,
                    ambiguities = results.ambiguities_detected,
                    issues = results.compliance_issues,
                    "Analysis completed"
                );
                state.draft.set_analysis_results(results);
                self.events.publish(WorkflowEvent::DraftChanged);
                Ok(())
            },
            None,
        )
        .await
    }

    /// Start the ambiguity session for the current job, or return the one already running.
    pub async fn start_ambiguity_session(&self) -> Result<String, WorkflowError> {
        let existing = {
            let mut state = self.state.lock().await;
            match start_decision(&state) {
                Ok(StartDecision::Existing { session_id }) => Some(session_id),
                Ok(StartDecision::Dispatch) => None,
                Err(error) => {
                    self.notify_error(&mut state, &error);
                    return Err(error);
                }
            }
        };
        if let Some(session_id) = existing {
            debug!(%session_id, "Ambiguity session already exists");
            return Ok(session_id);
        }

        self.run_task(
            TaskName::ChatbotStart,
            |state| match start_decision(state)? {
                StartDecision::Dispatch => Ok(ChatbotStartRequest {
                    project_data: ProjectData::from(&state.draft),
                    session_id: None,
                }),
                StartDecision::Existing { .. } => Err(SessionError::AlreadyStarted.into()),
            },
            |backend, request| async move { backend.start_chatbot(&request).await },
            |state, response| {
                let job_id = state
                    .draft
                    .job_id()
                    .map(str::to_string)
                    .ok_or(Precondition::JobNotStarted)?;
                let session_id = response.session_id.clone();
                state.session.apply_start(&job_id, response);
                self.events.publish(WorkflowEvent::SessionStarted {
                    session_id: session_id.clone(),
                });
                self.events.publish(WorkflowEvent::TranscriptAppended {
                    entries: state.session.transcript().len(),
                });
                Ok(session_id)
            },
            None,
        )
        .await
    }

    /// Send one user answer. Returns true when the reply completed the session.
    pub async fn send_turn(&self, text: &str) -> Result<bool, WorkflowError> {
        let completed = self
            .run_task(
                TaskName::ChatbotMessage,
                |state| {
                    let message = state.session.check_turn(text)?;
                    let session_id = state
                        .session
                        .session_id()
                        .map(str::to_string)
                        .ok_or(SessionError::NotActive)?;
                    state.session.record_user_turn(&message);
                    self.events.publish(WorkflowEvent::TranscriptAppended {
                        entries: state.session.transcript().len(),
                    });
                    Ok(ChatbotMessageRequest {
                        session_id,
                        message,
                    })
                },
                |backend, request| async move { backend.send_chatbot_message(&request).await },
                |state, reply| {
                    let completed = state.session.apply_reply(reply);
                    self.events.publish(WorkflowEvent::TranscriptAppended {
                        entries: state.session.transcript().len(),
                    });
                    if completed {
                        if let Some(outcome) = state.session.outcome() {
                            self.events.publish(WorkflowEvent::SessionCompleted {
                                session_id: outcome.session_id.clone(),
                                ambiguities_resolved: outcome.ambiguities_resolved,
                            });
                            state.draft.set_resolution(outcome);
                            self.events.publish(WorkflowEvent::DraftChanged);
                            self.notify(
                                state,
                                NotificationLevel::Info,
                                NotificationKind::SessionCompleted,
                                "Ambigüedades resueltas.".to_string(),
                            );
                        }
                    }
                    Ok(completed)
                },
                Some(record_turn_failure as FailureHook),
            )
            .await?;

        if completed && self.settings.auto_advance_after_resolution {
            let on_resolution_step = {
                let state = self.state.lock().await;
                let resolution_step = state
                    .wizard
                    .definition()
                    .step_with_effect(StepEffect::StartAmbiguitySession);
                resolution_step.is_some() && state.wizard.current_step() == resolution_step
            };
            if on_resolution_step {
                if let Err(error) = self.change_step(Direction::Forward).await {
                    warn!(%error, "Could not advance after resolution");
                }
            }
        }

        Ok(completed)
    }

    pub async fn generate_checklist(&self) -> Result<FinalChecklist, WorkflowError> {
        self.run_task(
            TaskName::GenerateChecklist,
            |state| {
                let draft = &state.draft;
                draft.job_id().ok_or(Precondition::JobNotStarted)?;
                Ok(ChecklistRequest {
                    project_data: ProjectData::from(draft),
                    normative_application: draft.normative_application().cloned(),
                    compliance_results: draft.analysis_results().cloned(),
                })
            },
            |backend, request| async move { backend.generate_checklist(&request).await },
            |state, checklist| {
                info!(
                    completion = checklist.overall_completion,
                    total_items = checklist.total_items,
                    critical_items = checklist.critical_items,
                    "Final checklist generated"
                );
                state.draft.set_final_checklist(checklist.clone());
                self.events.publish(WorkflowEvent::DraftChanged);
                Ok(checklist)
            },
            None,
        )
        .await
    }

    pub async fn generate_report(&self) -> Result<FinalReport, WorkflowError> {
        self.run_task(
            TaskName::GenerateReport,
            |state| {
                let draft = &state.draft;
                draft.job_id().ok_or(Precondition::JobNotStarted)?;
                let checklist = draft.final_checklist().ok_or(Precondition::ChecklistMissing)?;
                Ok(ReportRequest {
                    project_data: ProjectData::from(draft),
                    normative_application: draft.normative_application().cloned(),
                    compliance_results: draft.analysis_results().cloned(),
                    checklist_data: Some(checklist.clone()),
                })
            },
            |backend, request| async move { backend.generate_report(&request).await },
            |state, report| {
                state.draft.set_final_report(report.clone());
                self.events.publish(WorkflowEvent::DraftChanged);
                Ok(report)
            },
            None,
        )
        .await
    }

    pub async fn export_checklist(&self) -> Result<ExportPayload, WorkflowError> {
        self.run_task(
            TaskName::ExportChecklist,
            |state| {
                let job_id = state.draft.job_id().ok_or(Precondition::JobNotStarted)?;
                Ok(job_id.to_string())
            },
            |backend, job_id| async move { backend.export_checklist(&job_id).await },
            |_, payload| Ok(payload),
            None,
        )
        .await
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let wizard = &state.wizard;

        WorkflowSnapshot {
            mode: wizard.mode(),
            max_steps: wizard.max_steps(),
            step_title: wizard
                .current_step()
                .and_then(|n| wizard.definition().step(n))
                .map(|step| step.title.clone()),
            visible_steps: wizard.visible_steps(),
            progress: wizard.progress(),
            affordances: NavigationAffordances {
                can_go_back: wizard.can_go_back(),
                can_go_forward: wizard.can_go_forward(&state.draft),
                blocked_by: wizard.forward_blocker(&state.draft),
            },
            tasks: state
                .tasks
                .snapshot()
                .into_iter()
                .map(|(name, status)| TaskSnapshot { name, status })
                .collect(),
            session: state.session.view(),
            notifications: state.notifications.active(Utc::now()),
            classification_summary: state.draft.classification().map(|c| c.summary()),
            results: state.draft.final_checklist().map(summarize),
            draft: state.draft.clone(),
        }
    }
}

fn record_turn_failure(state: &mut WorkflowState, error: &AsyncTaskError) {
    state.session.record_failure(&error.to_string());
}

fn start_decision(state: &WorkflowState) -> Result<StartDecision, WorkflowError> {
    let job_id = state.draft.job_id().ok_or(Precondition::JobNotStarted)?;
    let results = state
        .draft
        .analysis_results()
        .ok_or(Precondition::AnalysisMissing)?;
    if !results.has_ambiguities() {
        return Err(Precondition::NoAmbiguities.into());
    }
    Ok(state.session.check_start(job_id)?)
}

/// Why a response no longer belongs to the current workflow, if it does not.
fn stale_reason(state: &WorkflowState, ticket: &TaskTicket) -> Option<&'static str> {
    if !state.tasks.is_current(ticket) {
        return Some("task superseded");
    }
    if state.draft.generation() != ticket.generation {
        return Some("draft was reset");
    }
    if state.draft.job_id() != ticket.job_id.as_deref() {
        return Some("job changed");
    }
    if ticket.session_id.is_some() && state.session.session_id() != ticket.session_id.as_deref() {
        return Some("session changed");
    }
    None
}
