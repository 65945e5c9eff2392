use log::{debug, trace};
use std::collections::VecDeque;

use super::persistence::{Storage, GAME_BOARD_KEY, SCORES_KEY};
use crate::model::{BoardSnapshot, GameError};

pub const DEFAULT_HISTORY_DEPTH: usize = 3;

/// Bounded undo store. Index 0 is the current position; older positions
/// follow and the oldest is evicted once `depth` is exceeded.
#[derive(Debug, Clone)]
pub struct MoveHistory {
    snapshots: VecDeque<BoardSnapshot>,
    depth: usize,
}

impl Default for MoveHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl MoveHistory {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            snapshots: VecDeque::with_capacity(depth + 1),
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn current(&self) -> Option<&BoardSnapshot> {
        self.snapshots.front()
    }

    /// Most-recent-first.
    pub fn snapshots(&self) -> impl Iterator<Item = &BoardSnapshot> {
        self.snapshots.iter()
    }

    pub fn available_undos(&self) -> usize {
        self.snapshots.len().saturating_sub(1)
    }

    pub fn push(&mut self, snapshot: BoardSnapshot) {
        self.snapshots.push_front(snapshot);
        self.snapshots.truncate(self.depth);
        trace!(target: "history", "Pushed snapshot; {} retained", self.snapshots.len());
    }

    /// Drops the current position and returns the one before it, which
    /// becomes current. Needs at least two retained snapshots.
    pub fn undo(&mut self) -> Result<BoardSnapshot, GameError> {
        if self.snapshots.len() < 2 {
            return Err(GameError::NotAvailable);
        }
        self.snapshots.pop_front();
        let target = self.snapshots.front().cloned().ok_or(GameError::NotAvailable)?;
        debug!(target: "history", "Undo to score {}", target.score);
        Ok(target)
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Writes the two parallel records: `game-board` (array of row-major
    /// boards) and `scores`.
    pub fn save(&self, storage: &mut dyn Storage) -> std::io::Result<()> {
        let boards: Vec<&Vec<u32>> = self.snapshots.iter().map(|s| &s.cells).collect();
        let scores: Vec<u64> = self.snapshots.iter().map(|s| s.score).collect();
        storage.write(GAME_BOARD_KEY, &serde_json::to_string(&boards)?)?;
        storage.write(SCORES_KEY, &serde_json::to_string(&scores)?)
    }

    /// Reads the records written by [`MoveHistory::save`]. `Ok(None)` when
    /// nothing was stored. A single flat board array is accepted as a
    /// one-entry history; a missing `scores` record then means a score of 0.
    pub fn load(storage: &dyn Storage, depth: usize) -> Result<Option<Self>, GameError> {
        let Some(board_text) = storage.read(GAME_BOARD_KEY) else {
            return Ok(None);
        };
        let boards: Vec<Vec<u32>> = match serde_json::from_str::<Vec<Vec<u32>>>(&board_text) {
            Ok(boards) => boards,
            Err(_) => vec![serde_json::from_str::<Vec<u32>>(&board_text)
                .map_err(|err| GameError::CorruptPersistedState(format!("game-board: {}", err)))?],
        };
        let scores: Vec<u64> = match storage.read(SCORES_KEY) {
            Some(text) => serde_json::from_str(&text)
                .map_err(|err| GameError::CorruptPersistedState(format!("scores: {}", err)))?,
            None if boards.len() == 1 => vec![0],
            None => {
                return Err(GameError::CorruptPersistedState(
                    "scores record missing".to_string(),
                ))
            }
        };
        if boards.len() != scores.len() {
            return Err(GameError::CorruptPersistedState(format!(
                "{} boards but {} scores",
                boards.len(),
                scores.len()
            )));
        }

        let mut history = Self::new(depth);
        for (cells, score) in boards.into_iter().zip(scores).rev() {
            let snapshot = BoardSnapshot { cells, score };
            // validates length
            snapshot.to_board()?;
            history.push(snapshot);
        }
        if history.is_empty() {
            return Ok(None);
        }
        Ok(Some(history))
    }
}
