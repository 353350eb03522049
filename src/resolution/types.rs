use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::types::{SuggestedAction, TurnType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Message,
    Question,
    Clarification,
    Confirmation,
    Information,
    Error,
    Completion,
}

impl From<TurnType> for EntryKind {
    fn from(turn: TurnType) -> Self {
        match turn {
            TurnType::Question => EntryKind::Question,
            TurnType::Clarification => EntryKind::Clarification,
            TurnType::Confirmation => EntryKind::Confirmation,
            TurnType::Information => EntryKind::Information,
            TurnType::Error => EntryKind::Error,
            TurnType::Completion => EntryKind::Completion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EntryKind,
}

impl TranscriptEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text, EntryKind::Message)
    }

    pub fn system(text: impl Into<String>, kind: EntryKind) -> Self {
        Self::new(Speaker::System, text, kind)
    }

    fn new(speaker: Speaker, text: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Active,
    Completed,
}

/// Read-only copy of a session for snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub session_id: Option<String>,
    pub job_id: Option<String>,
    pub transcript: Vec<TranscriptEntry>,
    pub ambiguities_remaining: u32,
    pub ambiguities_resolved: u32,
    pub suggested_actions: Vec<SuggestedAction>,
    pub accepts_turns: bool,
}
