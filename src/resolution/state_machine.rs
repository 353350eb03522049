use chrono::{DateTime, Utc};
use statig::prelude::*;

use super::types::{EntryKind, SessionPhase, TranscriptEntry};
use crate::backend::types::{ChatbotReply, ChatbotStartResponse, SuggestedAction};

pub(crate) const COMPLETION_MESSAGE: &str =
    "Todas las ambigüedades han sido resueltas. Puede continuar con el checklist final.";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started {
        job_id: String,
        response: ChatbotStartResponse,
    },
    UserTurn {
        text: String,
    },
    Reply(ChatbotReply),
    TurnFailed {
        message: String,
    },
}

/// Conversation state of one ambiguity-resolution session.
///
/// The handlers only record what happened; preconditions (active phase, non-blank text)
/// are checked by the engine before an event is dispatched.
#[derive(Debug, Default)]
pub struct ResolutionSession {
    pub(crate) phase: SessionPhase,
    pub(crate) session_id: Option<String>,
    pub(crate) job_id: Option<String>,
    pub(crate) transcript: Vec<TranscriptEntry>,
    pub(crate) ambiguities_remaining: u32,
    pub(crate) ambiguities_resolved: u32,
    pub(crate) suggested_actions: Vec<SuggestedAction>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
}

#[state_machine(initial = "State::uninitialized()")]
impl ResolutionSession {
    #[state]
    fn uninitialized(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Started { job_id, response } => {
                self.session_id = Some(response.session_id.clone());
                self.job_id = Some(job_id.clone());
                self.ambiguities_remaining = response.ambiguities_count;
                self.ambiguities_resolved = 0;

                if let Some(message) = &response.message {
                    if !message.content.trim().is_empty() {
                        let kind = message
                            .turn_type
                            .map(EntryKind::from)
                            .unwrap_or(EntryKind::Message);
                        self.transcript
                            .push(TranscriptEntry::system(message.content.clone(), kind));
                    }
                    self.suggested_actions = message.suggested_actions.clone();
                }

                self.phase = SessionPhase::Active;
                tracing::info!(
                    session_id = %response.session_id,
                    job_id = %job_id,
                    ambiguities = response.ambiguities_count,
                    "Ambiguity session started"
                );
                Transition(State::active())
            }
            _ => Handled,
        }
    }

    #[state]
    fn active(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::UserTurn { text } => {
                self.transcript.push(TranscriptEntry::user(text.clone()));
                Handled
            }
            SessionEvent::Reply(reply) => {
                if !reply.content.trim().is_empty() {
                    self.transcript.push(TranscriptEntry::system(
                        reply.content.clone(),
                        EntryKind::from(reply.turn_type),
                    ));
                }
                self.suggested_actions = reply.suggested_actions.clone();
                if let Some(status) = &reply.session_status {
                    if let Some(remaining) = status.ambiguities_remaining {
                        self.ambiguities_remaining = remaining;
                    }
                    if let Some(resolved) = status.ambiguities_resolved {
                        self.ambiguities_resolved = resolved;
                    }
                }

                if !reply.is_completion() {
                    return Handled;
                }

                if reply.session_status.as_ref().and_then(|s| s.ambiguities_resolved).is_none() {
                    self.ambiguities_resolved = self
                        .ambiguities_resolved
                        .saturating_add(self.ambiguities_remaining);
                }
                self.ambiguities_remaining = 0;
                self.suggested_actions.clear();
                self.transcript.push(TranscriptEntry::system(
                    COMPLETION_MESSAGE,
                    EntryKind::Completion,
                ));
                self.phase = SessionPhase::Completed;
                self.completed_at = Some(Utc::now());
                tracing::info!(
                    session_id = ?self.session_id,
                    resolved = self.ambiguities_resolved,
                    "Ambiguity session completed"
                );
                Transition(State::completed())
            }
            SessionEvent::TurnFailed { message } => {
                self.transcript
                    .push(TranscriptEntry::system(message.clone(), EntryKind::Error));
                tracing::warn!(session_id = ?self.session_id, %message, "Ambiguity turn failed");
                Handled
            }
            SessionEvent::Started { .. } => Handled,
        }
    }

    #[state]
    fn completed(event: &SessionEvent) -> Outcome<State> {
        tracing::debug!(?event, "Session already completed, ignoring event");
        Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn start_response() -> ChatbotStartResponse {
        serde_json::from_value(json!({
            "session_id": "s-1",
            "state": "initial",
            "ambiguities_count": 2,
            "message": {"type": "question", "content": "¿El sótano es garaje?", "suggested_actions": [{"label": "Sí"}]}
        }))
        .unwrap()
    }

    fn reply(turn_type: &str, content: &str) -> ChatbotReply {
        serde_json::from_value(json!({"type": turn_type, "content": content})).unwrap()
    }

    #[test]
    fn test_session_lifecycle() {
        let mut sm = ResolutionSession::default().state_machine();
        sm.handle(&SessionEvent::UserTurn {
            text: "ignored before start".to_string(),
        });
        assert!(sm.inner().transcript.is_empty());

        sm.handle(&SessionEvent::Started {
            job_id: "job-1".to_string(),
            response: start_response(),
        });
        assert_eq!(sm.inner().phase, SessionPhase::Active);
        assert_eq!(sm.inner().transcript.len(), 1);
        assert_eq!(sm.inner().suggested_actions.len(), 1);

        sm.handle(&SessionEvent::UserTurn {
            text: "Sí".to_string(),
        });
        sm.handle(&SessionEvent::Reply(reply("confirmation", "Anotado.")));
        assert_eq!(sm.inner().transcript.len(), 3);
        assert!(sm.inner().suggested_actions.is_empty());

        sm.handle(&SessionEvent::Reply(reply("completion", "Perfecto.")));
        let session = sm.inner();
        assert_eq!(session.phase, SessionPhase::Completed);
        assert_eq!(session.ambiguities_remaining, 0);
        assert_eq!(session.ambiguities_resolved, 2);
        assert_eq!(session.transcript.last().unwrap().kind, EntryKind::Completion);
        assert!(session.completed_at.is_some());

        let entries = session.transcript.len();
        sm.handle(&SessionEvent::UserTurn {
            text: "¿algo más?".to_string(),
        });
        assert_eq!(sm.inner().transcript.len(), entries);
    }

    #[test]
    fn test_completion_counters_saturate() {
        let mut response = start_response();
        response.ambiguities_count = u32::MAX;
        let mut sm = ResolutionSession::default().state_machine();
        sm.handle(&SessionEvent::Started {
            job_id: "job-1".to_string(),
            response,
        });

        let progress: ChatbotReply = serde_json::from_value(json!({
            "type": "confirmation",
            "content": "Anotado.",
            "session_status": {"ambiguities_resolved": 5}
        }))
        .unwrap();
        sm.handle(&SessionEvent::Reply(progress));
        sm.handle(&SessionEvent::Reply(reply("completion", "Perfecto.")));

        let session = sm.inner();
        assert_eq!(session.phase, SessionPhase::Completed);
        assert_eq!(session.ambiguities_resolved, u32::MAX);
        assert_eq!(session.ambiguities_remaining, 0);
    }
}
