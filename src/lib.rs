pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod repository;
pub mod search;
pub mod session;
pub mod sync;
pub mod workspace;

pub use config::{JotterConfig, Surface};
pub use entity::Note;
pub use error::{JotterError, Result};
pub use events::{EventBus, FailureKind, SyncFailure, WorkspaceEvent};
pub use repository::{MemoryNoteRepository, NoteRepository, SqliteNoteRepository};
pub use session::Session;
pub use sync::{DebounceConfig, SaveController, SaveState};
pub use workspace::{SaveOutcome, WorkspaceStore};
