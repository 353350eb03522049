use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use super::{AsyncTaskError, ConcurrentRequest, TaskName};
use crate::telemetry::generate_correlation_id;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Idle,
    Pending {
        started_at: DateTime<Utc>,
        correlation_id: String,
    },
    Succeeded {
        finished_at: DateTime<Utc>,
    },
    Failed {
        finished_at: DateTime<Utc>,
        error: AsyncTaskError,
    },
}

impl TaskStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Pending { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Idle => "idle",
            TaskStatus::Pending { .. } => "pending",
            TaskStatus::Succeeded { .. } => "succeeded",
            TaskStatus::Failed { .. } => "failed",
        }
    }
}

/// Proof of dispatch. A response is only applied while its ticket is still current and
/// still matches the draft it was issued against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTicket {
    pub name: TaskName,
    pub attempt: u64,
    pub correlation_id: String,
    pub generation: u64,
    pub job_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct TaskEntry {
    status: TaskStatus,
    /// Status before the current dispatch, restored when it is abandoned
    previous: TaskStatus,
    attempt: u64,
}

/// Lifecycle of every named task of one workflow.
#[derive(Debug, Default)]
pub struct TaskBoard {
    entries: HashMap<TaskName, TaskEntry>,
    /// Monotonic across resets so tickets from an abandoned attempt never match again
    next_attempt: u64,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, name: TaskName) -> TaskStatus {
        self.entries
            .get(&name)
            .map(|entry| entry.status.clone())
            .unwrap_or_default()
    }

    pub fn is_pending(&self, name: TaskName) -> bool {
        self.entries
            .get(&name)
            .is_some_and(|entry| entry.status.is_pending())
    }

    pub fn any_pending(&self) -> bool {
        self.entries.values().any(|entry| entry.status.is_pending())
    }

    /// Move `name` to pending. Fails without touching the running instance when it is
    /// already pending.
    pub fn begin(
        &mut self,
        name: TaskName,
        generation: u64,
        job_id: Option<String>,
        session_id: Option<String>,
    ) -> Result<TaskTicket, ConcurrentRequest> {
        if self.is_pending(name) {
            return Err(ConcurrentRequest(name));
        }

        self.next_attempt += 1;
        let correlation_id = generate_correlation_id();
        let entry = self.entries.entry(name).or_default();
        entry.attempt = self.next_attempt;
        entry.previous = std::mem::replace(
            &mut entry.status,
            TaskStatus::Pending {
                started_at: Utc::now(),
                correlation_id: correlation_id.clone(),
            },
        );
        debug!(task = %name, attempt = entry.attempt, %correlation_id, "Task pending");

        Ok(TaskTicket {
            name,
            attempt: entry.attempt,
            correlation_id,
            generation,
            job_id,
            session_id,
        })
    }

    /// Whether the board still waits on exactly this dispatch.
    pub fn is_current(&self, ticket: &TaskTicket) -> bool {
        self.entries
            .get(&ticket.name)
            .is_some_and(|entry| entry.attempt == ticket.attempt && entry.status.is_pending())
    }

    pub fn succeed(&mut self, ticket: &TaskTicket) -> bool {
        self.finish(
            ticket,
            TaskStatus::Succeeded {
                finished_at: Utc::now(),
            },
        )
    }

    pub fn fail(&mut self, ticket: &TaskTicket, error: AsyncTaskError) -> bool {
        self.finish(
            ticket,
            TaskStatus::Failed {
                finished_at: Utc::now(),
                error,
            },
        )
    }

    /// Release a dispatch that never happened or whose response was discarded.
    pub fn abandon(&mut self, ticket: &TaskTicket) -> bool {
        let previous = match self.entries.get(&ticket.name) {
            Some(entry) => entry.previous.clone(),
            None => return false,
        };
        self.finish(ticket, previous)
    }

    pub fn snapshot(&self) -> Vec<(TaskName, TaskStatus)> {
        TaskName::ALL
            .iter()
            .map(|name| (*name, self.status(*name)))
            .collect()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    fn finish(&mut self, ticket: &TaskTicket, status: TaskStatus) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        if let Some(entry) = self.entries.get_mut(&ticket.name) {
            debug!(task = %ticket.name, state = status.label(), "Task finished");
            entry.status = status;
        }
        true
    }
}
