use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DebounceConfig, Draft, PendingEdit, SaveState};
use crate::error::{JotterError, Result};
use crate::events::WorkspaceEvent;
use crate::repository::NoteRepository;
use crate::workspace::{SaveOutcome, WorkspaceStore};

/// A quiet-period timer waiting to commit a note.
struct Scheduled {
    counter: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct ControllerState {
    pending: HashMap<Uuid, PendingEdit>,
    timers: HashMap<Uuid, Scheduled>,
    save_states: HashMap<Uuid, SaveState>,
    /// One write per note at a time.
    lanes: HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>,
    next_counter: u64,
}

/// Turns keystroke-level edits into debounced repository writes.
///
/// Each edit replaces the note's buffered edit and restarts its quiet-period
/// timer. When the timer elapses the newest buffered values are written
/// through [`WorkspaceStore::update_note_content`]. Timers are tokio tasks
/// keyed by note id; cancelling one guarantees its write never starts.
///
/// Must be used from within a tokio runtime.
pub struct SaveController<R> {
    store: Arc<WorkspaceStore<R>>,
    config: DebounceConfig,
    state: Arc<Mutex<ControllerState>>,
}

impl<R> Clone for SaveController<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
            state: Arc::clone(&self.state),
        }
    }
}

impl<R: NoteRepository> SaveController<R> {
    pub fn new(store: Arc<WorkspaceStore<R>>, config: DebounceConfig) -> Self {
        Self {
            store,
            config,
            state: Arc::new(Mutex::new(ControllerState::default())),
        }
    }

    pub fn config(&self) -> DebounceConfig {
        self.config
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_save_state(&self, state: &mut ControllerState, id: Uuid, next: SaveState) {
        if state.save_states.get(&id) == Some(&next) {
            return;
        }
        state.save_states.insert(id, next.clone());
        self.store
            .events()
            .emit(WorkspaceEvent::SaveStateChanged { note_id: id, state: next });
    }

    /// Drop everything held for `id` and stop its timer.
    fn forget(&self, state: &mut ControllerState, id: Uuid) {
        if let Some(scheduled) = state.timers.remove(&id) {
            scheduled.token.cancel();
        }
        state.pending.remove(&id);
        state.lanes.remove(&id);
        if state.save_states.remove(&id).is_some() {
            self.store.events().emit(WorkspaceEvent::SaveStateChanged {
                note_id: id,
                state: SaveState::Idle,
            });
        }
    }

    /// Drop the lane once nothing is left to write and no other commit holds
    /// a handle to it. Handles are only cloned under the state lock.
    fn release_lane(state: &mut ControllerState, id: Uuid, lane: &Arc<tokio::sync::Mutex<()>>) {
        let ours = state.lanes.get(&id).is_some_and(|l| Arc::ptr_eq(l, lane));
        if ours && !state.pending.contains_key(&id) && Arc::strong_count(lane) == 2 {
            state.lanes.remove(&id);
        }
    }

    /// Buffer an edit and restart the note's quiet period.
    /// Edits to unknown notes are ignored and return false.
    pub fn record_edit(
        &self,
        id: Uuid,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> bool {
        if !self.store.contains(id) {
            debug!(note_id = %id, "ignoring edit of unknown note");
            return false;
        }

        let token = CancellationToken::new();
        let counter = {
            let mut state = self.state();
            state.next_counter += 1;
            let counter = state.next_counter;
            state.pending.insert(
                id,
                PendingEdit {
                    title: title.into(),
                    content: content.into(),
                    counter,
                },
            );
            let scheduled = Scheduled {
                counter,
                token: token.clone(),
            };
            if let Some(previous) = state.timers.insert(id, scheduled) {
                previous.token.cancel();
            }
            self.set_save_state(&mut state, id, SaveState::Pending);
            counter
        };

        let controller = self.clone();
        let window = self.config.window;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(window) => controller.on_quiet_period(id, counter).await,
            }
        });
        debug!(note_id = %id, counter, "save scheduled");
        true
    }

    async fn on_quiet_period(&self, id: Uuid, counter: u64) {
        {
            let mut state = self.state();
            let current = state
                .timers
                .get(&id)
                .is_some_and(|s| s.counter == counter && !s.token.is_cancelled());
            if !current {
                return;
            }
            state.timers.remove(&id);
        }
        // Failures are already reported by the store and the save state.
        let _ = self.commit(id).await;
    }

    /// Write the newest buffered edit for `id`, waiting for any write
    /// already in flight for the same note.
    async fn commit(&self, id: Uuid) -> Result<Option<SaveOutcome>> {
        let lane = {
            let mut state = self.state();
            Arc::clone(state.lanes.entry(id).or_default())
        };
        let _turn = lane.lock().await;

        let edit = {
            let mut state = self.state();
            let Some(edit) = state.pending.get(&id).cloned() else {
                Self::release_lane(&mut state, id, &lane);
                return Ok(None);
            };
            self.set_save_state(&mut state, id, SaveState::Saving);
            edit
        };

        let result = self
            .store
            .update_note_content(id, &edit.content, &edit.title)
            .await;

        let mut state = self.state();
        let still_newest = state
            .pending
            .get(&id)
            .is_some_and(|p| p.counter == edit.counter);

        match result {
            Ok(outcome) => {
                if still_newest {
                    state.pending.remove(&id);
                    self.set_save_state(&mut state, id, SaveState::Saved);
                }
                Self::release_lane(&mut state, id, &lane);
                Ok(Some(outcome))
            }
            Err(JotterError::NoteNotFound(_)) if !self.store.contains(id) => {
                debug!(note_id = %id, "note deleted before its save, dropping edit");
                self.forget(&mut state, id);
                Ok(None)
            }
            Err(e) => {
                warn!(note_id = %id, error = %e, "save failed, keeping edit");
                if still_newest {
                    self.set_save_state(&mut state, id, SaveState::Error(e.to_string()));
                }
                Err(e)
            }
        }
    }

    /// Commit the buffered edit for `id` now, skipping the rest of its
    /// quiet period. Also the retry trigger after a failed save.
    /// Returns `Ok(None)` when nothing was buffered.
    pub async fn flush(&self, id: Uuid) -> Result<Option<SaveOutcome>> {
        {
            let mut state = self.state();
            if let Some(scheduled) = state.timers.remove(&id) {
                scheduled.token.cancel();
            }
        }
        self.commit(id).await
    }

    /// Flush every buffered edit. Every note is attempted; the first
    /// failure is returned.
    pub async fn flush_all(&self) -> Result<()> {
        let ids: Vec<Uuid> = self.state().pending.keys().copied().collect();
        let mut first_error = None;
        for id in ids {
            if let Err(e) = self.flush(id).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Cancel the timer and drop the buffered edit without writing.
    /// Returns whether anything was buffered or scheduled.
    pub fn discard(&self, id: Uuid) -> bool {
        let mut state = self.state();
        let had_work = state.pending.contains_key(&id) || state.timers.contains_key(&id);
        self.forget(&mut state, id);
        if had_work {
            debug!(note_id = %id, "discarded pending edit");
        }
        had_work
    }

    /// Drop timers, edits and save states of notes the store no longer has,
    /// e.g. after a reload found them deleted elsewhere. Returns how many
    /// notes were forgotten.
    pub fn forget_missing(&self) -> usize {
        let known: HashSet<Uuid> = self.store.notes().iter().map(|n| n.id).collect();
        let mut state = self.state();
        let missing: HashSet<Uuid> = state
            .save_states
            .keys()
            .chain(state.pending.keys())
            .chain(state.timers.keys())
            .chain(state.lanes.keys())
            .filter(|id| !known.contains(id))
            .copied()
            .collect();
        for id in &missing {
            self.forget(&mut state, *id);
        }
        if !missing.is_empty() {
            debug!(count = missing.len(), "forgot state of missing notes");
        }
        missing.len()
    }

    /// Editor buffer for `id`: the buffered edit if one is waiting,
    /// otherwise the note's current values.
    pub fn draft_for(&self, id: Uuid) -> Option<Draft> {
        let pending = self.state().pending.get(&id).cloned();
        if let Some(edit) = pending {
            return Some(Draft {
                note_id: id,
                title: edit.title,
                content: edit.content,
            });
        }
        self.store.note(id).map(|note| Draft {
            note_id: id,
            title: note.title,
            content: note.content,
        })
    }

    pub fn save_state(&self, id: Uuid) -> SaveState {
        self.state().save_states.get(&id).cloned().unwrap_or_default()
    }

    pub fn pending_edit(&self, id: Uuid) -> Option<PendingEdit> {
        self.state().pending.get(&id).cloned()
    }

    /// Whether a quiet-period timer is running for `id`.
    pub fn has_scheduled_write(&self, id: Uuid) -> bool {
        self.state().timers.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }
}
