// src/entity/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to notes created through the "add" intent.
pub const DEFAULT_TITLE: &str = "New Note";
/// Content given to notes created through the "add" intent.
pub const DEFAULT_CONTENT: &str = "# ";
/// Shown wherever a note with an empty title is listed.
pub const UNTITLED: &str = "Untitled Note";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Word and character counts shown next to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteStats {
    pub words: usize,
    pub characters: usize,
}

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Title used for tabs, lists and the palette.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    pub fn stats(&self) -> NoteStats {
        NoteStats {
            words: self.content.split_whitespace().count(),
            characters: self.content.chars().count(),
        }
    }

    /// First 7 characters of the id, as printed by the CLI.
    pub fn short_id(&self) -> String {
        self.id.to_string()[..7].to_string()
    }
}
