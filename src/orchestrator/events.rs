//! Best-effort broadcast of task events.
//!
//! Each subscriber gets its own unbounded channel. Events are sent after
//! the task table commit they describe; a subscriber that went away is
//! dropped silently.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};

use super::task::{TaskId, TaskState};
use crate::catalog::{Action, SoftwareId};
use crate::engine::TaskOutcome;

/// A state change or an output line of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    /// Task.
    pub task_id: TaskId,
    /// Target entry.
    pub software_id: SoftwareId,
    /// Action.
    pub action: Action,
    /// State at emission.
    pub state: TaskState,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Present on output events.
    pub output_line: Option<String>,
    /// Present on terminal events.
    pub outcome: Option<TaskOutcome>,
}

/// Fan-out of [`TaskEvent`]s to any number of subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<TaskEvent>>>,
}

impl EventBus {
    /// A bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. The receiver disconnects when the bus is dropped.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<TaskEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Send `event` to every live subscriber.
    pub fn emit(&self, event: &TaskEvent) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
