// Workspace configuration: `<root>/.jotter/config.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{JotterError, Result};
use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::sync::DebounceConfig;

pub const JOTTER_DIR: &str = ".jotter";
pub const CONFIG_FILE: &str = "config.json";

/// Path to the workspace directory: `<root>/.jotter`.
pub fn workspace_dir(root: &Path) -> PathBuf {
    root.join(JOTTER_DIR)
}

/// Path to the config file: `<root>/.jotter/config.json`.
pub fn config_path(root: &Path) -> PathBuf {
    workspace_dir(root).join(CONFIG_FILE)
}

/// Kind of editor surface driving the workspace. Each has its own quiet period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    #[default]
    Desktop,
    Mobile,
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Surface::Desktop => write!(f, "desktop"),
            Surface::Mobile => write!(f, "mobile"),
        }
    }
}

impl std::str::FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desktop" => Ok(Surface::Desktop),
            "mobile" => Ok(Surface::Mobile),
            _ => Err(format!("Invalid surface: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JotterConfig {
    pub surface: Surface,
    /// Overrides the surface's quiet period, in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Buffer size of the workspace event channel.
    pub event_capacity: usize,
}

impl Default for JotterConfig {
    fn default() -> Self {
        Self {
            surface: Surface::Desktop,
            debounce_ms: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl JotterConfig {
    pub fn for_surface(surface: Surface) -> Self {
        Self {
            surface,
            ..Self::default()
        }
    }

    /// Quiet period after overrides and clamping.
    pub fn debounce(&self) -> DebounceConfig {
        match self.debounce_ms {
            Some(ms) => DebounceConfig::with_millis(ms),
            None => DebounceConfig::for_surface(self.surface),
        }
    }

    /// Load from `<root>/.jotter/config.json`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load(root: &Path) -> Self {
        let path = config_path(root);
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                if path.exists() {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "ignoring unreadable config"
                    );
                }
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| JotterError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
