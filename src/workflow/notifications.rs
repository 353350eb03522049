use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use super::errors::{ErrorKind, WorkflowError};
use crate::draft::{DocumentSelection, DraftError, RejectionReason};
use crate::tasks::TaskName;
use crate::wizard::ValidationErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NotificationKind {
    Error(ErrorKind),
    PartialSelection,
    TaskCompleted(TaskName),
    SessionCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Dismissible, auto-expiring user notifications. The oldest entry is dropped once the
/// center is full.
#[derive(Debug)]
pub struct NotificationCenter {
    items: VecDeque<Notification>,
    next_id: u64,
    ttl: Duration,
    capacity: usize,
}

impl NotificationCenter {
    pub fn new(ttl: std::time::Duration, capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            next_id: 1,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(8)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(
        &mut self,
        level: NotificationLevel,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Notification {
        let created_at = Utc::now();
        let notification = Notification {
            id: self.next_id,
            level,
            kind,
            message: message.into(),
            created_at,
            expires_at: created_at + self.ttl,
        };
        self.next_id += 1;

        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(notification.clone());
        notification
    }

    pub fn push_error(&mut self, error: &WorkflowError) -> Notification {
        self.push(
            NotificationLevel::Error,
            NotificationKind::Error(error.kind()),
            describe_error(error),
        )
    }

    /// Live notifications; expired ones are pruned.
    pub fn active(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        self.items.retain(|n| !n.is_expired(now));
        self.items.iter().cloned().collect()
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

pub fn describe_validation(kind: &ValidationErrorKind) -> String {
    match kind {
        ValidationErrorKind::MissingPrimaryUse => {
            "Seleccione el uso principal del edificio.".to_string()
        }
        ValidationErrorKind::NoSecondaryUses => {
            "Añada al menos un uso secundario o desactive los usos secundarios.".to_string()
        }
        ValidationErrorKind::SecondaryUseWithoutFloors { use_type } => {
            format!("Indique las plantas del uso secundario '{use_type}'.")
        }
        ValidationErrorKind::MissingMemoria => "Suba la memoria descriptiva en PDF.".to_string(),
        ValidationErrorKind::MissingPlanos => "Suba al menos un plano en PDF.".to_string(),
        ValidationErrorKind::AnalysisPending => "El análisis todavía no ha terminado.".to_string(),
        ValidationErrorKind::NoDocumentsAnalyzed => {
            "El análisis no ha procesado ningún documento.".to_string()
        }
        ValidationErrorKind::AmbiguitiesUnresolved => {
            "Resuelva las ambigüedades detectadas antes de continuar.".to_string()
        }
    }
}

pub fn describe_error(error: &WorkflowError) -> String {
    match error {
        WorkflowError::Validation(kind) => describe_validation(kind),
        WorkflowError::Draft(DraftError::NoValidFiles { kind }) => {
            format!("Ningún archivo de {kind} es un PDF válido.")
        }
        other => other.to_string(),
    }
}

pub fn describe_selection(selection: &DocumentSelection) -> String {
    let rejected: Vec<String> = selection
        .rejected
        .iter()
        .map(|file| match file.reason {
            RejectionReason::NotPdf => format!("{} (no es PDF)", file.name),
            RejectionReason::SlotFull => format!("{} (solo se admite una memoria)", file.name),
        })
        .collect();
    format!("Archivos descartados: {}", rejected.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn center() -> NotificationCenter {
        NotificationCenter::new(std::time::Duration::from_secs(5), 3)
    }

    #[test]
    fn test_notifications_expire() {
        let mut center = center();
        let notification = center.push(
            NotificationLevel::Info,
            NotificationKind::SessionCompleted,
            "listo",
        );

        assert_eq!(center.active(notification.created_at).len(), 1);
        let later = notification.created_at + Duration::seconds(6);
        assert!(center.active(later).is_empty());
    }

    #[test]
    fn test_dismiss_and_capacity() {
        let mut center = center();
        let first = center.push(NotificationLevel::Info, NotificationKind::PartialSelection, "1");
        for n in 2..=4 {
            center.push(NotificationLevel::Info, NotificationKind::PartialSelection, n.to_string());
        }

        let now = Utc::now();
        let active = center.active(now);
        assert_eq!(active.len(), 3);
        assert!(active.iter().all(|n| n.id != first.id));

        assert!(center.dismiss(active[0].id));
        assert!(!center.dismiss(active[0].id));
        assert_eq!(center.active(now).len(), 2);
    }

    #[test]
    fn test_validation_errors_are_rendered() {
        let mut center = center();
        let notification =
            center.push_error(&WorkflowError::Validation(ValidationErrorKind::MissingPrimaryUse));
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(notification.kind, NotificationKind::Error(ErrorKind::Validation));
        assert_eq!(notification.message, "Seleccione el uso principal del edificio.");
    }
}
