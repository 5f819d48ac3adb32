use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of one emission task: a (source, dataset) pair.
///
/// At most one running task may exist per key at any time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenKey {
    pub source: String,
    pub dataset: String,
}

impl GenKey {
    pub fn new(source: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dataset: dataset.into(),
        }
    }
}

impl fmt::Display for GenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.dataset)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenKeyParseError {
    #[error("expected <source>:<dataset>, got {0:?}")]
    MissingSeparator(String),
    #[error("source and dataset must be non-empty")]
    EmptyComponent,
}

impl FromStr for GenKey {
    type Err = GenKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((source, dataset)) = s.split_once(':') else {
            return Err(GenKeyParseError::MissingSeparator(s.to_string()));
        };
        let source = source.trim();
        let dataset = dataset.trim();
        if source.is_empty() || dataset.is_empty() {
            return Err(GenKeyParseError::EmptyComponent);
        }
        Ok(Self::new(source, dataset))
    }
}

/// One generated record and the data stream it is destined for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub doc: serde_json::Value,
    pub data_stream: String,
}

impl Event {
    pub fn new(doc: serde_json::Value, data_stream: impl Into<String>) -> Self {
        Self {
            doc,
            data_stream: data_stream.into(),
        }
    }
}

/// Bounded buffer of events awaiting a single bulk delivery call.
///
/// Invariants:
/// - capacity >= 1 (a zero capacity is clamped at construction)
/// - `take()` leaves the batch empty with its capacity intact
#[derive(Debug)]
pub struct Batch {
    events: Vec<Event>,
    capacity: usize,
}

impl Batch {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empties the batch, handing its contents to the caller for delivery.
    pub fn take(&mut self) -> Vec<Event> {
        std::mem::replace(&mut self.events, Vec::with_capacity(self.capacity))
    }
}

/// Lifecycle of a registered emission task.
///
/// `Stopping` is visible between the cancellation request and the end of the
/// drain flush; only the task itself moves the state to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Running => "running",
            TaskState::Stopping => "stopping",
            TaskState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Point-in-time status snapshot entry for one registry key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    pub rate_per_second: f64,
    pub total_emitted: u64,
}

impl TaskStatus {
    /// True until the task has fully drained and exited its loop.
    pub fn is_running(&self) -> bool {
        !matches!(self.state, TaskState::Stopped)
    }
}
