//! Ambiguity resolution: a turn-based conversation with the chatbot collaborator that
//! runs after the analysis reports ambiguities.

pub mod state_machine;
pub mod types;

pub use state_machine::{ResolutionSession, SessionEvent};
pub use types::{EntryKind, SessionPhase, SessionView, Speaker, TranscriptEntry};

use statig::prelude::*;
use std::fmt;
use thiserror::Error;

use crate::backend::types::{ChatbotReply, ChatbotStartResponse, SuggestedAction};
use crate::draft::ResolutionOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No ambiguity session is active")]
    NotActive,
    #[error("The ambiguity session is already completed")]
    AlreadyCompleted,
    #[error("An ambiguity session is already running for this job")]
    AlreadyStarted,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Session belongs to job {expected}, not {actual}")]
    JobMismatch { expected: String, actual: String },
}

/// What `start` should do for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartDecision {
    /// No session yet; call chatbot-start
    Dispatch,
    /// Keep the session already running or finished for this job
    Existing { session_id: String },
}

pub struct AmbiguityResolutionEngine {
    machine: StateMachine<ResolutionSession>,
}

impl fmt::Debug for AmbiguityResolutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbiguityResolutionEngine")
            .field("session", self.session())
            .finish()
    }
}

impl Default for AmbiguityResolutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AmbiguityResolutionEngine {
    pub fn new() -> Self {
        Self {
            machine: ResolutionSession::default().state_machine(),
        }
    }

    fn session(&self) -> &ResolutionSession {
        self.machine.inner()
    }

    pub fn phase(&self) -> SessionPhase {
        self.session().phase
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session().session_id.as_deref()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.session().job_id.as_deref()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.session().transcript
    }

    pub fn ambiguities_remaining(&self) -> u32 {
        self.session().ambiguities_remaining
    }

    pub fn ambiguities_resolved(&self) -> u32 {
        self.session().ambiguities_resolved
    }

    pub fn suggested_actions(&self) -> &[SuggestedAction] {
        &self.session().suggested_actions
    }

    pub fn accepts_turns(&self) -> bool {
        self.phase() == SessionPhase::Active
    }

    /// Decide whether starting for `job_id` needs a request. A session that is active or
    /// completed for the same job is reused as is.
    pub fn check_start(&self, job_id: &str) -> Result<StartDecision, SessionError> {
        match (self.phase(), self.job_id(), self.session_id()) {
            (SessionPhase::Uninitialized, _, _) => Ok(StartDecision::Dispatch),
            (_, Some(current), Some(session_id)) if current == job_id => Ok(StartDecision::Existing {
                session_id: session_id.to_string(),
            }),
            (_, current, _) => Err(SessionError::JobMismatch {
                expected: current.unwrap_or_default().to_string(),
                actual: job_id.to_string(),
            }),
        }
    }

    pub fn apply_start(&mut self, job_id: &str, response: ChatbotStartResponse) {
        self.machine.handle(&SessionEvent::Started {
            job_id: job_id.to_string(),
            response,
        });
    }

    /// Validate a user turn and return the text to send.
    pub fn check_turn(&self, text: &str) -> Result<String, SessionError> {
        match self.phase() {
            SessionPhase::Uninitialized => return Err(SessionError::NotActive),
            SessionPhase::Completed => return Err(SessionError::AlreadyCompleted),
            SessionPhase::Active => {}
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        Ok(trimmed.to_string())
    }

    pub fn record_user_turn(&mut self, text: &str) {
        self.machine.handle(&SessionEvent::UserTurn {
            text: text.to_string(),
        });
    }

    /// Apply a chatbot reply; returns true when it completed the session.
    pub fn apply_reply(&mut self, reply: ChatbotReply) -> bool {
        self.machine.handle(&SessionEvent::Reply(reply));
        self.phase() == SessionPhase::Completed
    }

    pub fn record_failure(&mut self, message: &str) {
        self.machine.handle(&SessionEvent::TurnFailed {
            message: message.to_string(),
        });
    }

    pub fn outcome(&self) -> Option<ResolutionOutcome> {
        let session = self.session();
        match (session.phase, &session.session_id, session.completed_at) {
            (SessionPhase::Completed, Some(session_id), Some(completed_at)) => {
                Some(ResolutionOutcome {
                    session_id: session_id.clone(),
                    ambiguities_resolved: session.ambiguities_resolved,
                    completed_at,
                })
            }
            _ => None,
        }
    }

    pub fn view(&self) -> SessionView {
        let session = self.session();
        SessionView {
            phase: session.phase,
            session_id: session.session_id.clone(),
            job_id: session.job_id.clone(),
            transcript: session.transcript.clone(),
            ambiguities_remaining: session.ambiguities_remaining,
            ambiguities_resolved: session.ambiguities_resolved,
            suggested_actions: session.suggested_actions.clone(),
            accepts_turns: self.accepts_turns(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn started_engine() -> AmbiguityResolutionEngine {
        let mut engine = AmbiguityResolutionEngine::new();
        let response = serde_json::from_value(json!({
            "session_id": "s-42",
            "ambiguities_count": 1,
            "message": {"content": "Hola, tengo una pregunta."}
        }))
        .unwrap();
        engine.apply_start("job-1", response);
        engine
    }

    #[test]
    fn test_turns_rejected_before_start() {
        let engine = AmbiguityResolutionEngine::new();
        assert_eq!(engine.check_turn("hola"), Err(SessionError::NotActive));
        assert_eq!(engine.check_start("job-1"), Ok(StartDecision::Dispatch));
    }

    #[test]
    fn test_start_is_reused_for_the_same_job() {
        let engine = started_engine();
        assert_eq!(
            engine.check_start("job-1"),
            Ok(StartDecision::Existing {
                session_id: "s-42".to_string()
            })
        );
        assert!(matches!(
            engine.check_start("job-2"),
            Err(SessionError::JobMismatch { .. })
        ));
    }

    #[test]
    fn test_blank_turn_is_rejected() {
        let engine = started_engine();
        assert_eq!(engine.check_turn("   "), Err(SessionError::EmptyMessage));
        assert_eq!(engine.check_turn("  planta 2 "), Ok("planta 2".to_string()));
    }

    #[test]
    fn test_completion_reply_closes_the_session() {
        let mut engine = started_engine();
        engine.record_user_turn("El garaje está en el sótano 1");
        let completed = engine.apply_reply(
            serde_json::from_value(json!({
                "type": "completion",
                "content": "Gracias, todo claro.",
                "session_status": {"ambiguities_remaining": 0, "ambiguities_resolved": 1}
            }))
            .unwrap(),
        );

        assert!(completed);
        assert!(!engine.accepts_turns());
        assert_eq!(engine.check_turn("otra"), Err(SessionError::AlreadyCompleted));
        let outcome = engine.outcome().unwrap();
        assert_eq!(outcome.session_id, "s-42");
        assert_eq!(outcome.ambiguities_resolved, 1);

        let speakers: Vec<Speaker> = engine.transcript().iter().map(|e| e.speaker).collect();
        assert_eq!(
            speakers,
            vec![Speaker::System, Speaker::User, Speaker::System, Speaker::System]
        );
    }

    #[test]
    fn test_failed_turn_keeps_session_active() {
        let mut engine = started_engine();
        engine.record_user_turn("respuesta");
        engine.record_failure("chatbot-message failed with network error: timeout");

        assert!(engine.accepts_turns());
        assert_eq!(engine.transcript().last().unwrap().kind, EntryKind::Error);
        assert!(engine.outcome().is_none());
    }
}
