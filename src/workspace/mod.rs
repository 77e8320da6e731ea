//! Canonical note collection and open-tab state.

mod store;
mod tabs;

pub use store::{SaveOutcome, WorkspaceStore};
pub use tabs::Tabs;
