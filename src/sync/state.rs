use serde::Serialize;
use uuid::Uuid;

/// Per-note save indicator shown by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    #[default]
    Idle,
    /// Edits buffered, quiet period running.
    Pending,
    /// A write is in flight.
    Saving,
    Saved,
    /// The newest write failed; the edit is still buffered.
    Error(String),
}

impl std::fmt::Display for SaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveState::Idle => write!(f, "idle"),
            SaveState::Pending => write!(f, "unsaved changes"),
            SaveState::Saving => write!(f, "saving"),
            SaveState::Saved => write!(f, "saved"),
            SaveState::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Latest unsaved edit for one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub title: String,
    pub content: String,
    /// Increases with every edit, across all notes.
    pub counter: u64,
}

/// Editor buffer for the focused note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub note_id: Uuid,
    pub title: String,
    pub content: String,
}
