//! The workspace object handed to a UI.
//!
//! A [`Session`] is built explicitly from a repository and a config. It
//! starts empty; nothing is fetched until [`Session::load_all`].

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::JotterConfig;
use crate::entity::Note;
use crate::error::Result;
use crate::events::{EventBus, SyncFailure, WorkspaceEvent};
use crate::repository::NoteRepository;
use crate::search::filter_notes;
use crate::sync::{DebounceConfig, Draft, SaveController, SaveState};
use crate::workspace::{SaveOutcome, WorkspaceStore};

pub struct Session<R> {
    store: Arc<WorkspaceStore<R>>,
    saver: SaveController<R>,
}

impl<R: NoteRepository> Session<R> {
    pub fn new(repo: Arc<R>, config: &JotterConfig) -> Self {
        Self::with_debounce(repo, config.debounce(), config.event_capacity)
    }

    pub fn with_debounce(repo: Arc<R>, debounce: DebounceConfig, event_capacity: usize) -> Self {
        let store = Arc::new(WorkspaceStore::new(repo, EventBus::new(event_capacity)));
        let saver = SaveController::new(Arc::clone(&store), debounce);
        Self { store, saver }
    }

    pub fn store(&self) -> &Arc<WorkspaceStore<R>> {
        &self.store
    }

    pub fn saver(&self) -> &SaveController<R> {
        &self.saver
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.store.events().subscribe()
    }

    pub async fn load_all(&self) -> Result<usize> {
        let count = self.store.load_all().await?;
        self.saver.forget_missing();
        Ok(count)
    }

    pub async fn add_note(&self) -> Result<Note> {
        self.store.add_note().await
    }

    pub fn open_note(&self, id: Uuid) -> bool {
        self.store.open_note(id)
    }

    /// Closing a tab leaves any pending save for that note running.
    pub fn close_note(&self, id: Uuid) -> bool {
        self.store.close_note(id)
    }

    pub fn set_active_note_id(&self, id: Option<Uuid>) -> bool {
        self.store.set_active_note_id(id)
    }

    /// Open and focus `id`, returning what the editor should show.
    pub fn select_note(&self, id: Uuid) -> Option<Draft> {
        if !self.store.open_note(id) {
            return None;
        }
        self.saver.draft_for(id)
    }

    /// Record an editor change; persisted after the quiet period.
    pub fn edit(&self, id: Uuid, title: impl Into<String>, content: impl Into<String>) -> bool {
        self.saver.record_edit(id, title, content)
    }

    /// Record an editor change for the focused note.
    pub fn edit_active(&self, title: impl Into<String>, content: impl Into<String>) -> bool {
        match self.store.active_note_id() {
            Some(id) => self.saver.record_edit(id, title, content),
            None => false,
        }
    }

    /// Write immediately, bypassing the quiet period.
    pub async fn update_note_content(
        &self,
        id: Uuid,
        content: &str,
        title: &str,
    ) -> Result<SaveOutcome> {
        self.store.update_note_content(id, content, title).await
    }

    /// Drop any unsaved edit for `id`, then delete it.
    pub async fn delete_note(&self, id: Uuid) -> Result<bool> {
        self.saver.discard(id);
        self.store.delete_note(id).await
    }

    pub async fn flush(&self, id: Uuid) -> Result<Option<SaveOutcome>> {
        self.saver.flush(id).await
    }

    pub async fn flush_all(&self) -> Result<()> {
        self.saver.flush_all().await
    }

    /// Palette search over the current collection.
    pub fn search(&self, query: &str) -> Vec<Note> {
        let notes = self.store.notes();
        filter_notes(&notes, query).into_iter().cloned().collect()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.store.notes()
    }

    pub fn note(&self, id: Uuid) -> Option<Note> {
        self.store.note(id)
    }

    pub fn open_note_ids(&self) -> Vec<Uuid> {
        self.store.open_note_ids()
    }

    pub fn active_note_id(&self) -> Option<Uuid> {
        self.store.active_note_id()
    }

    pub fn active_note(&self) -> Option<Note> {
        self.store.active_note()
    }

    pub fn open_notes(&self) -> Vec<Note> {
        self.store.open_notes()
    }

    pub fn draft_for(&self, id: Uuid) -> Option<Draft> {
        self.saver.draft_for(id)
    }

    pub fn active_draft(&self) -> Option<Draft> {
        self.store.active_note_id().and_then(|id| self.saver.draft_for(id))
    }

    pub fn save_state(&self, id: Uuid) -> SaveState {
        self.saver.save_state(id)
    }

    pub fn last_error(&self) -> Option<SyncFailure> {
        self.store.last_error()
    }
}
