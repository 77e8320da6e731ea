mod note;

pub use note::{Note, NoteStats, DEFAULT_CONTENT, DEFAULT_TITLE, UNTITLED};
