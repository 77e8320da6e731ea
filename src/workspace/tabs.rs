use serde::Serialize;
use uuid::Uuid;

/// Open editor tabs and the focused tab.
///
/// Tab order is insertion order and never changes except by removal. The
/// active id is always one of the open ids, or `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tabs {
    open_note_ids: Vec<Uuid>,
    active_note_id: Option<Uuid>,
}

impl Tabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_note_ids(&self) -> &[Uuid] {
        &self.open_note_ids
    }

    pub fn active_note_id(&self) -> Option<Uuid> {
        self.active_note_id
    }

    pub fn is_open(&self, id: Uuid) -> bool {
        self.open_note_ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.open_note_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_note_ids.is_empty()
    }

    /// Append `id` if it isn't open yet, then focus it.
    /// Returns whether anything changed.
    pub fn open(&mut self, id: Uuid) -> bool {
        let mut changed = false;
        if !self.is_open(id) {
            self.open_note_ids.push(id);
            changed = true;
        }
        if self.active_note_id != Some(id) {
            self.active_note_id = Some(id);
            changed = true;
        }
        changed
    }

    /// Remove `id`. When it was focused, focus moves to its left neighbour,
    /// or to the new leftmost tab when it was leftmost.
    /// Returns false when `id` wasn't open.
    pub fn close(&mut self, id: Uuid) -> bool {
        let Some(index) = self.open_note_ids.iter().position(|open| *open == id) else {
            return false;
        };
        self.open_note_ids.remove(index);

        if self.active_note_id == Some(id) {
            self.active_note_id = self
                .open_note_ids
                .get(index.saturating_sub(1))
                .copied();
        }
        true
    }

    /// Focus an open tab, or clear focus with `None`.
    /// Returns false when `id` isn't open; focus is left untouched.
    pub fn focus(&mut self, id: Option<Uuid>) -> bool {
        match id {
            Some(id) if !self.is_open(id) => false,
            _ => {
                self.active_note_id = id;
                true
            }
        }
    }

    /// Close every tab whose id fails `keep`, applying the close focus rule
    /// to each. Returns whether any tab was closed.
    pub fn retain(&mut self, mut keep: impl FnMut(&Uuid) -> bool) -> bool {
        let vanished: Vec<Uuid> = self
            .open_note_ids
            .iter()
            .filter(|id| !keep(id))
            .copied()
            .collect();
        for id in &vanished {
            self.close(*id);
        }
        !vanished.is_empty()
    }
}
