//! Note repository capability.
//!
//! The workspace engine only needs four operations against the persistent
//! notes table. Transport concerns (retries, authentication) belong to the
//! implementation behind this trait.

mod memory;
mod sqlite;

pub use memory::{MemoryNoteRepository, Operation, RecordedWrite};
pub use sqlite::SqliteNoteRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::Note;
use crate::error::Result;

#[async_trait]
pub trait NoteRepository: Send + Sync + 'static {
    /// Every stored note, in no particular order.
    async fn list_all(&self) -> Result<Vec<Note>>;

    /// Insert a note and return it with its assigned id and timestamps.
    async fn insert(&self, title: &str, content: &str) -> Result<Note>;

    /// Replace title and content. The store stamps `updated_at` itself.
    async fn update_by_id(&self, id: Uuid, content: &str, title: &str) -> Result<()>;

    async fn delete_by_id(&self, id: Uuid) -> Result<()>;
}
