//! Debounced persistence of editor changes.
//!
//! The editor reports every keystroke through [`SaveController::record_edit`].
//! Writes reach the repository only once a note has been quiet for the
//! configured window, always carrying that note's newest title and content.

mod controller;
mod debounce;
mod state;

pub use controller::SaveController;
pub use debounce::{DebounceConfig, DEFAULT_DEBOUNCE_MS, MOBILE_DEBOUNCE_MS};
pub use state::{Draft, PendingEdit, SaveState};
