use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Tabs;
use crate::entity::{Note, DEFAULT_CONTENT, DEFAULT_TITLE};
use crate::error::{JotterError, Result};
use crate::events::{EventBus, FailureKind, SyncFailure, WorkspaceEvent};
use crate::repository::NoteRepository;

/// Result of a successful `update_note_content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Title and content already matched the stored note; nothing was sent.
    Unchanged,
    /// The write landed and is the newest local revision.
    Committed { revision: u64 },
    /// The write landed but newer local state exists (or the note was
    /// deleted meanwhile). Local state was left alone.
    Stale { revision: u64 },
}

/// Values last confirmed by the repository.
#[derive(Debug, Clone)]
struct Synced {
    title: String,
    content: String,
    revision: u64,
}

#[derive(Debug, Clone)]
struct NoteEntry {
    note: Note,
    /// Bumped by every optimistic update.
    revision: u64,
    synced: Synced,
}

impl NoteEntry {
    fn fresh(note: Note, revision: u64) -> Self {
        let synced = Synced {
            title: note.title.clone(),
            content: note.content.clone(),
            revision,
        };
        Self {
            note,
            revision,
            synced,
        }
    }

    fn is_dirty(&self) -> bool {
        self.revision > self.synced.revision
    }
}

#[derive(Debug, Default)]
struct StoreState {
    /// Newest first.
    entries: Vec<NoteEntry>,
    tabs: Tabs,
    /// Ids deleted locally, kept until a listing no longer has them.
    tombstones: HashSet<Uuid>,
    last_error: Option<SyncFailure>,
}

impl StoreState {
    fn entry(&self, id: Uuid) -> Option<&NoteEntry> {
        self.entries.iter().find(|e| e.note.id == id)
    }

    fn entry_mut(&mut self, id: Uuid) -> Option<&mut NoteEntry> {
        self.entries.iter_mut().find(|e| e.note.id == id)
    }

    fn contains(&self, id: Uuid) -> bool {
        self.entry(id).is_some()
    }

    fn workspace_event(&self) -> WorkspaceEvent {
        WorkspaceEvent::WorkspaceChanged {
            open_note_ids: self.tabs.open_note_ids().to_vec(),
            active_note_id: self.tabs.active_note_id(),
        }
    }

    fn notes_event(&self) -> WorkspaceEvent {
        WorkspaceEvent::NotesChanged {
            count: self.entries.len(),
        }
    }
}

/// Canonical in-memory view of every note plus the open tabs.
///
/// All mutations are synchronous with respect to the caller: local state is
/// updated before any repository call is awaited, and the state lock is
/// never held across an await.
pub struct WorkspaceStore<R> {
    repo: Arc<R>,
    state: Mutex<StoreState>,
    events: EventBus,
}

impl<R: NoteRepository> WorkspaceStore<R> {
    /// Empty workspace; nothing is loaded until `load_all`.
    pub fn new(repo: Arc<R>, events: EventBus) -> Self {
        Self {
            repo,
            state: Mutex::new(StoreState::default()),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Every note, newest first.
    pub fn notes(&self) -> Vec<Note> {
        self.state().entries.iter().map(|e| e.note.clone()).collect()
    }

    pub fn note(&self, id: Uuid) -> Option<Note> {
        self.state().entry(id).map(|e| e.note.clone())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.state().contains(id)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    pub fn tabs(&self) -> Tabs {
        self.state().tabs.clone()
    }

    pub fn open_note_ids(&self) -> Vec<Uuid> {
        self.state().tabs.open_note_ids().to_vec()
    }

    pub fn active_note_id(&self) -> Option<Uuid> {
        self.state().tabs.active_note_id()
    }

    pub fn active_note(&self) -> Option<Note> {
        let state = self.state();
        let id = state.tabs.active_note_id()?;
        state.entry(id).map(|e| e.note.clone())
    }

    /// Notes for the tab strip, in tab order.
    pub fn open_notes(&self) -> Vec<Note> {
        let state = self.state();
        state
            .tabs
            .open_note_ids()
            .iter()
            .filter_map(|id| state.entry(*id).map(|e| e.note.clone()))
            .collect()
    }

    /// Whether local title/content are ahead of what the repository confirmed.
    pub fn is_dirty(&self, id: Uuid) -> bool {
        self.state().entry(id).is_some_and(NoteEntry::is_dirty)
    }

    pub fn last_error(&self) -> Option<SyncFailure> {
        self.state().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state().last_error = None;
    }

    // ── Tabs ────────────────────────────────────────────────────────

    /// Open `id` as a tab (appended if new) and focus it.
    /// Unknown ids are ignored and return false.
    pub fn open_note(&self, id: Uuid) -> bool {
        let mut state = self.state();
        if !state.contains(id) {
            debug!(note_id = %id, "ignoring open of unknown note");
            return false;
        }
        if state.tabs.open(id) {
            self.events.emit(state.workspace_event());
        }
        true
    }

    /// Close the tab for `id`, moving focus to its left neighbour when it
    /// was active. Returns false when no such tab is open.
    pub fn close_note(&self, id: Uuid) -> bool {
        let mut state = self.state();
        if !state.tabs.close(id) {
            debug!(note_id = %id, "ignoring close of tab that isn't open");
            return false;
        }
        self.events.emit(state.workspace_event());
        true
    }

    /// Focus an open tab, or clear focus with `None`. Never opens a tab.
    pub fn set_active_note_id(&self, id: Option<Uuid>) -> bool {
        let mut state = self.state();
        if state.tabs.active_note_id() == id {
            return true;
        }
        if !state.tabs.focus(id) {
            debug!(note_id = ?id, "ignoring focus of tab that isn't open");
            return false;
        }
        self.events.emit(state.workspace_event());
        true
    }

    // ── Repository-backed operations ────────────────────────────────

    /// Replace the collection with the repository's listing, newest first.
    ///
    /// Open tabs survive when their note still exists. On failure the
    /// collection and tabs are left exactly as they were.
    pub async fn load_all(&self) -> Result<usize> {
        // (revision, synced revision) of every note when the fetch starts.
        let (before, tombstoned_before) = {
            let state = self.state();
            let before: HashMap<Uuid, (u64, u64)> = state
                .entries
                .iter()
                .map(|e| (e.note.id, (e.revision, e.synced.revision)))
                .collect();
            (before, state.tombstones.clone())
        };

        let mut listed = match self.repo.list_all().await {
            Ok(notes) => notes,
            Err(e) => {
                self.report(FailureKind::Fetch, None, &e);
                return Err(e);
            }
        };
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut state = self.state();
        let listed_ids: HashSet<Uuid> = listed.iter().map(|n| n.id).collect();
        let mut previous = std::mem::take(&mut state.entries);

        let mut entries: Vec<NoteEntry> = Vec::with_capacity(listed.len());
        for note in listed {
            if state.tombstones.contains(&note.id) {
                continue;
            }
            let entry = match previous.iter().position(|e| e.note.id == note.id) {
                Some(index) => {
                    let mut existing = previous.swap_remove(index);
                    let unchanged_since_fetch = before.get(&note.id)
                        == Some(&(existing.revision, existing.synced.revision));
                    if !unchanged_since_fetch {
                        // Updated or confirmed after the listing was taken;
                        // the listing is older than what we hold.
                        debug!(note_id = %note.id, "keeping note changed during load");
                    } else if existing.is_dirty() {
                        // Local edits are still on their way; keep showing them.
                        existing.synced.title = note.title;
                        existing.synced.content = note.content;
                        existing.note.created_at = note.created_at;
                    } else {
                        let revision = existing.revision;
                        existing = NoteEntry::fresh(note, revision);
                    }
                    existing
                }
                None => NoteEntry::fresh(note, 0),
            };
            entries.push(entry);
        }

        // Notes inserted while the listing was in flight aren't in it yet.
        for entry in previous {
            if !before.contains_key(&entry.note.id) && !listed_ids.contains(&entry.note.id) {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| b.note.created_at.cmp(&a.note.created_at));
        state.entries = entries;
        // Gone remotely, so no listing can bring these back.
        state
            .tombstones
            .retain(|id| listed_ids.contains(id) || !tombstoned_before.contains(id));

        let StoreState { entries, tabs, .. } = &mut *state;
        let pruned = tabs.retain(|id| entries.iter().any(|e| e.note.id == *id));

        let count = state.entries.len();
        info!(count, "loaded notes");
        self.events.emit(state.notes_event());
        if pruned {
            self.events.emit(state.workspace_event());
        }
        Ok(count)
    }

    /// Create a note with the default title and content, then open and
    /// focus it. Nothing changes locally when the insert fails.
    pub async fn add_note(&self) -> Result<Note> {
        let note = match self.repo.insert(DEFAULT_TITLE, DEFAULT_CONTENT).await {
            Ok(note) => note,
            Err(e) => {
                self.report(FailureKind::Insert, None, &e);
                return Err(e);
            }
        };

        let mut state = self.state();
        if !state.contains(note.id) {
            state.entries.insert(0, NoteEntry::fresh(note.clone(), 0));
        }
        state.tabs.open(note.id);
        info!(note_id = %note.id, "added note");
        self.events.emit(state.notes_event());
        self.events.emit(state.workspace_event());
        Ok(note)
    }

    /// Close the note's tab, drop it from the collection and delete it
    /// remotely. Local removal is not rolled back if the remote delete
    /// fails. Returns `Ok(false)` for unknown ids.
    pub async fn delete_note(&self, id: Uuid) -> Result<bool> {
        {
            let mut state = self.state();
            if !state.contains(id) {
                debug!(note_id = %id, "ignoring delete of unknown note");
                return Ok(false);
            }
            let closed = state.tabs.close(id);
            state.entries.retain(|e| e.note.id != id);
            state.tombstones.insert(id);
            self.events.emit(state.notes_event());
            if closed {
                self.events.emit(state.workspace_event());
            }
        }

        match self.repo.delete_by_id(id).await {
            Ok(()) => {
                info!(note_id = %id, "deleted note");
                Ok(true)
            }
            Err(e) => {
                self.report(FailureKind::Delete, Some(id), &e);
                Err(e)
            }
        }
    }

    /// Apply new title/content locally, then write them to the repository.
    ///
    /// No write is made when the values equal what the repository last
    /// confirmed and no newer local revision is outstanding. A completion
    /// never overwrites newer local state.
    pub async fn update_note_content(
        &self,
        id: Uuid,
        content: &str,
        title: &str,
    ) -> Result<SaveOutcome> {
        let revision = {
            let mut state = self.state();
            let entry = state
                .entry_mut(id)
                .ok_or_else(|| JotterError::NoteNotFound(id.to_string()))?;

            if !entry.is_dirty() && entry.synced.title == title && entry.synced.content == content {
                debug!(note_id = %id, "content unchanged, skipping write");
                return Ok(SaveOutcome::Unchanged);
            }

            entry.revision += 1;
            entry.note.title = title.to_string();
            entry.note.content = content.to_string();
            entry.note.updated_at = Utc::now();
            let revision = entry.revision;
            self.events.emit(state.notes_event());
            revision
        };

        if let Err(e) = self.repo.update_by_id(id, content, title).await {
            if !self.contains(id) {
                debug!(note_id = %id, error = %e, "write failed after delete");
                return Err(JotterError::NoteNotFound(id.to_string()));
            }
            self.report(FailureKind::Update, Some(id), &e);
            return Err(e);
        }

        let mut state = self.state();
        let Some(entry) = state.entry_mut(id) else {
            debug!(note_id = %id, revision, "write landed after delete");
            return Ok(SaveOutcome::Stale { revision });
        };
        if revision > entry.synced.revision {
            entry.synced = Synced {
                title: title.to_string(),
                content: content.to_string(),
                revision,
            };
        }
        if entry.revision > revision {
            debug!(note_id = %id, revision, current = entry.revision, "write superseded");
            Ok(SaveOutcome::Stale { revision })
        } else {
            info!(note_id = %id, revision, "saved note");
            Ok(SaveOutcome::Committed { revision })
        }
    }

    fn report(&self, kind: FailureKind, note_id: Option<Uuid>, error: &JotterError) {
        let failure = SyncFailure::new(kind, note_id, error.to_string());
        warn!(kind = %kind, note_id = ?note_id, error = %error, "repository call failed");
        self.state().last_error = Some(failure.clone());
        self.events.emit(WorkspaceEvent::Failure(failure));
    }
}
