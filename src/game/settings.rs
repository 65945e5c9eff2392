use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::history::DEFAULT_HISTORY_DEPTH;
use super::score_tracker::ScorePolicy;

const APP_DIR: &str = "tilemerge";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub(crate) version: u32,

    /// Chance that a spawned tile is a 4 rather than a 2.
    #[serde(default = "default_spawn_four_probability")]
    pub spawn_four_probability: f64,

    /// Number of snapshots the undo store retains.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    #[serde(default)]
    pub score_policy: ScorePolicy,

    /// When set, a move waits for the renderer to report each tile
    /// transition before merging.
    #[serde(default)]
    pub animated: bool,
}

// Helper functions for default values
fn default_version() -> u32 {
    2
}
fn default_spawn_four_probability() -> f64 {
    0.1
}
fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: default_version(),
            spawn_four_probability: default_spawn_four_probability(),
            history_depth: default_history_depth(),
            score_policy: ScorePolicy::default(),
            animated: false,
        }
    }
}

impl Settings {
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(contents) = fs::read_to_string(path) {
            match serde_json::from_str::<Settings>(&contents) {
                Ok(mut settings) => {
                    settings.migrate();
                    return settings;
                }
                Err(err) => warn!(target: "settings", "Ignoring unreadable settings: {}", err),
            }
        }
        let default = Settings::default();
        if let Err(err) = default.save_to(path) {
            warn!(target: "settings", "Could not write default settings: {}", err);
        }
        default
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&Self::settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        // Ensure the directory exists
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
    }

    /// `$TILEMERGE_DATA_DIR`, else `$XDG_DATA_HOME/tilemerge`, else
    /// `$HOME/.local/share/tilemerge`, else a directory under the system temp dir.
    pub fn data_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os("TILEMERGE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(dir).join(APP_DIR);
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".local").join("share").join(APP_DIR);
        }
        std::env::temp_dir().join(APP_DIR)
    }

    fn settings_path() -> PathBuf {
        Self::data_dir().join("settings.json")
    }

    fn migrate(&mut self) {
        match self.version {
            // version 1 spawned 2 and 4 with equal odds
            0 | 1 => {
                self.version = 2;
            }
            _ => (),
        }
        if !(0.0..=1.0).contains(&self.spawn_four_probability) {
            warn!(
                target: "settings",
                "spawn_four_probability {} out of range, using default",
                self.spawn_four_probability
            );
            self.spawn_four_probability = default_spawn_four_probability();
        }
        self.history_depth = self.history_depth.max(1);
    }

    pub fn is_debug_mode() -> bool {
        std::env::var("DEBUG").map(|v| v == "1").unwrap_or(false)
    }

    pub fn seed_from_env() -> Option<u64> {
        std::env::var("SEED").ok().and_then(|v| v.parse::<u64>().ok())
    }
}
