//! Workflow events for observers (UIs, the CLI progress printer)

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::notifications::Notification;
use crate::tasks::{AsyncTaskError, TaskName};
use crate::wizard::WizardMode;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StepChanged { from: WizardMode, to: WizardMode },
    DraftChanged,
    TaskStarted { task: TaskName, correlation_id: String },
    TaskCompleted { task: TaskName },
    TaskFailed { error: AsyncTaskError },
    SessionStarted { session_id: String },
    TranscriptAppended { entries: usize },
    SessionCompleted { session_id: String, ambiguities_resolved: u32 },
    Notified { notification: Notification },
    WorkflowReset,
}

/// Fan-out of workflow events. Sending never blocks and never fails the workflow.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event, ignoring if nobody is listening
    pub fn publish(&self, event: WorkflowEvent) {
        if let Ok(count) = self.tx.send(event) {
            debug!(subscribers = count, "Published workflow event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(WorkflowEvent::DraftChanged);
        bus.publish(WorkflowEvent::WorkflowReset);

        assert_eq!(rx.recv().await.unwrap(), WorkflowEvent::DraftChanged);
        assert_eq!(rx.recv().await.unwrap(), WorkflowEvent::WorkflowReset);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new(1);
        bus.publish(WorkflowEvent::DraftChanged);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
