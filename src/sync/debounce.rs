// Quiet-period configuration for the save controller.
//
// Keystroke-level edits are coalesced until no edit has arrived for the
// window. Desktop editors use 500ms, mobile editors 1000ms; overrides are
// clamped to 50–5000ms.

use std::time::Duration;

use crate::config::Surface;

/// Default quiet period for desktop-class surfaces.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// Default quiet period for mobile surfaces.
pub const MOBILE_DEBOUNCE_MS: u64 = 1000;
/// Minimum allowed quiet period.
const MIN_DEBOUNCE_MS: u64 = 50;
/// Maximum allowed quiet period.
const MAX_DEBOUNCE_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    pub window: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl DebounceConfig {
    /// Create a config with the given window in milliseconds, clamped to [50, 5000].
    pub fn with_millis(ms: u64) -> Self {
        let clamped = ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS);
        Self {
            window: Duration::from_millis(clamped),
        }
    }

    pub fn for_surface(surface: Surface) -> Self {
        match surface {
            Surface::Desktop => Self::with_millis(DEFAULT_DEBOUNCE_MS),
            Surface::Mobile => Self::with_millis(MOBILE_DEBOUNCE_MS),
        }
    }
}
