//! Keyed-record storage the engine reads and writes. Values are text; the
//! record codecs live next to the types they encode.

use log::trace;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::settings::Settings;

pub const HIGHEST_SCORE_KEY: &str = "highest-score";
pub const GAME_BOARD_KEY: &str = "game-board";
pub const SCORES_KEY: &str = "scores";
pub const GAME_STATS_KEY: &str = "game-stats";

pub trait Storage {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// One file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage rooted at [`Settings::data_dir`].
    pub fn in_data_dir() -> Self {
        Self::new(Settings::data_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        trace!(target: "persistence", "Writing {} ({} bytes)", key, value.len());
        fs::write(self.path_for(key), value)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, key: &str, value: &str) -> Self {
        self.records.insert(key.to_string(), value.to_string());
        self
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.records.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.records.remove(key);
        Ok(())
    }
}
