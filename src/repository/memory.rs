use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::NoteRepository;
use crate::entity::Note;
use crate::error::{JotterError, Result};

/// Repository operations, used to inject failures and latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListAll,
    Insert,
    Update,
    Delete,
}

/// An update that reached the repository, in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Default)]
struct MemoryState {
    notes: Vec<Note>,
    failures: HashMap<Operation, String>,
    latency: HashMap<Operation, Duration>,
    calls: HashMap<Operation, usize>,
    writes: Vec<RecordedWrite>,
    deletes: Vec<Uuid>,
}

/// In-process note repository.
///
/// Behaves like a remote table: it owns its own copy of every note, and
/// failures or latency can be injected per operation. Used by tests and as a
/// scratch backend.
#[derive(Default)]
pub struct MemoryNoteRepository {
    state: Mutex<MemoryState>,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with existing notes.
    pub fn with_notes(notes: Vec<Note>) -> Self {
        let repo = Self::default();
        repo.state().notes = notes;
        repo
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call of `op` fail with `message` until cleared.
    pub fn fail(&self, op: Operation, message: impl Into<String>) {
        self.state().failures.insert(op, message.into());
    }

    pub fn clear_failure(&self, op: Operation) {
        self.state().failures.remove(&op);
    }

    /// Delay every call of `op` by `delay` before it takes effect.
    pub fn set_latency(&self, op: Operation, delay: Duration) {
        self.state().latency.insert(op, delay);
    }

    /// Number of calls made for `op`, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Successful updates, in the order they were applied.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state().writes.clone()
    }

    pub fn deletes(&self) -> Vec<Uuid> {
        self.state().deletes.clone()
    }

    /// Snapshot of the stored notes.
    pub fn stored(&self) -> Vec<Note> {
        self.state().notes.clone()
    }

    pub fn stored_note(&self, id: Uuid) -> Option<Note> {
        self.state().notes.iter().find(|n| n.id == id).cloned()
    }

    /// Insert a note directly, bypassing the engine (another client's write).
    pub fn put(&self, note: Note) {
        let mut state = self.state();
        state.notes.retain(|n| n.id != note.id);
        state.notes.push(note);
    }

    /// Remove a note directly, bypassing the engine.
    pub fn remove(&self, id: Uuid) {
        self.state().notes.retain(|n| n.id != id);
    }

    /// Count the call, then wait out injected latency and check for an
    /// injected failure.
    async fn begin(&self, op: Operation) -> Result<()> {
        let delay = {
            let mut state = self.state();
            *state.calls.entry(op).or_insert(0) += 1;
            state.latency.get(&op).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.state().failures.get(&op) {
            Some(message) => Err(JotterError::Repository(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    /// The listing reflects the table when the call was made, even if
    /// injected latency delays the reply.
    async fn list_all(&self) -> Result<Vec<Note>> {
        let snapshot = self.stored();
        self.begin(Operation::ListAll).await?;
        Ok(snapshot)
    }

    async fn insert(&self, title: &str, content: &str) -> Result<Note> {
        self.begin(Operation::Insert).await?;
        let note = Note::new(title, content);
        self.state().notes.push(note.clone());
        Ok(note)
    }

    async fn update_by_id(&self, id: Uuid, content: &str, title: &str) -> Result<()> {
        self.begin(Operation::Update).await?;
        let mut state = self.state();
        let note = state
            .notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| JotterError::NoteNotFound(id.to_string()))?;
        note.title = title.to_string();
        note.content = content.to_string();
        note.updated_at = Utc::now();
        state.writes.push(RecordedWrite {
            id,
            title: title.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        self.begin(Operation::Delete).await?;
        let mut state = self.state();
        let before = state.notes.len();
        state.notes.retain(|n| n.id != id);
        if state.notes.len() == before {
            return Err(JotterError::NoteNotFound(id.to_string()));
        }
        state.deletes.push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_list() {
        let repo = MemoryNoteRepository::new();
        let note = repo.insert("A", "body").await.unwrap();

        let listed = repo.list_all().await.unwrap();
        assert_eq!(listed, vec![note]);
        assert_eq!(repo.calls(Operation::Insert), 1);
        assert_eq!(repo.calls(Operation::ListAll), 1);
    }

    #[tokio::test]
    async fn test_update_records_write() {
        let repo = MemoryNoteRepository::new();
        let note = repo.insert("A", "body").await.unwrap();

        repo.update_by_id(note.id, "new body", "B").await.unwrap();

        let stored = repo.stored_note(note.id).unwrap();
        assert_eq!(stored.title, "B");
        assert_eq!(stored.content, "new body");
        assert!(stored.updated_at >= note.updated_at);
        assert_eq!(
            repo.writes(),
            vec![RecordedWrite {
                id: note.id,
                title: "B".to_string(),
                content: "new body".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_update_unknown_note_is_not_found() {
        let repo = MemoryNoteRepository::new();
        let result = repo.update_by_id(Uuid::new_v4(), "c", "t").await;
        assert!(matches!(result, Err(JotterError::NoteNotFound(_))));
        assert!(repo.writes().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_until_cleared() {
        let repo = MemoryNoteRepository::new();
        repo.fail(Operation::ListAll, "offline");

        let err = repo.list_all().await.unwrap_err();
        assert!(err.to_string().contains("offline"));

        repo.clear_failure(Operation::ListAll);
        assert!(repo.list_all().await.is_ok());
        assert_eq!(repo.calls(Operation::ListAll), 2);
    }

    #[tokio::test]
    async fn test_failed_insert_stores_nothing() {
        let repo = MemoryNoteRepository::new();
        repo.fail(Operation::Insert, "quota exceeded");

        assert!(repo.insert("A", "b").await.is_err());
        assert!(repo.stored().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_effect() {
        let repo = std::sync::Arc::new(MemoryNoteRepository::new());
        let note = repo.insert("A", "b").await.unwrap();
        repo.set_latency(Operation::Update, Duration::from_millis(200));

        let task = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.update_by_id(note.id, "slow", "A").await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(repo.writes().is_empty());

        task.await.unwrap().unwrap();
        assert_eq!(repo.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let repo = MemoryNoteRepository::new();
        let note = repo.insert("A", "b").await.unwrap();

        repo.delete_by_id(note.id).await.unwrap();
        assert!(repo.delete_by_id(note.id).await.is_err());
        assert_eq!(repo.deletes(), vec![note.id]);
    }
}
