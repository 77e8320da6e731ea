//! Events the workspace engine publishes to the presentation layer.
//!
//! Every change to the note collection, the tab strip or a note's save
//! indicator is announced on a broadcast channel. Subscribers that fall
//! behind lose the oldest events; each event carries enough state to redraw
//! without replaying history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::sync::SaveState;

/// Which adapter call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// `list_all` failed; the collection kept its previous value.
    Fetch,
    Insert,
    Update,
    Delete,
}

impl FailureKind {
    pub fn is_write(&self) -> bool {
        !matches!(self, FailureKind::Fetch)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Fetch => write!(f, "fetch"),
            FailureKind::Insert => write!(f, "insert"),
            FailureKind::Update => write!(f, "update"),
            FailureKind::Delete => write!(f, "delete"),
        }
    }
}

/// A caught adapter failure, kept for the error surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub kind: FailureKind,
    pub note_id: Option<Uuid>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl SyncFailure {
    pub fn new(kind: FailureKind, note_id: Option<Uuid>, message: impl Into<String>) -> Self {
        Self {
            kind,
            note_id,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.note_id {
            Some(id) => write!(f, "{} failed for note {}: {}", self.kind, id, self.message),
            None => write!(f, "{} failed: {}", self.kind, self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    NotesChanged {
        count: usize,
    },
    WorkspaceChanged {
        open_note_ids: Vec<Uuid>,
        active_note_id: Option<Uuid>,
    },
    SaveStateChanged {
        note_id: Uuid,
        state: SaveState,
    },
    Failure(SyncFailure),
}

impl WorkspaceEvent {
    /// Dot-namespaced name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            WorkspaceEvent::NotesChanged { .. } => "notes.changed",
            WorkspaceEvent::WorkspaceChanged { .. } => "workspace.changed",
            WorkspaceEvent::SaveStateChanged { .. } => "save_state.changed",
            WorkspaceEvent::Failure(_) => "sync.failure",
        }
    }
}

/// Default broadcast buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkspaceEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send to every subscriber. Dropped silently when nobody listens.
    pub fn emit(&self, event: WorkspaceEvent) {
        tracing::debug!(
            event_type = event.name(),
            subscriber_count = self.tx.receiver_count(),
            "workspace event"
        );
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
