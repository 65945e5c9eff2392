use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::persistence::{Storage, HIGHEST_SCORE_KEY};
use crate::model::GameBoard;

/// How the running score is derived after a settled move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// Add the value of every merge to the running score.
    #[default]
    MergeDeltas,
    /// Recompute as the sum of every tile on the board.
    BoardSum,
}

/// Sum of all settled tile values.
pub fn score_from_board(board: &GameBoard) -> u64 {
    board.tile_sum()
}

#[derive(Debug, Clone)]
pub struct ScoreTracker {
    policy: ScorePolicy,
    score: u64,
    highest: u64,
}

impl ScoreTracker {
    pub fn new(policy: ScorePolicy) -> Self {
        Self {
            policy,
            score: 0,
            highest: 0,
        }
    }

    /// Tracker whose highest score is read from `storage`.
    pub fn load(policy: ScorePolicy, storage: &mut dyn Storage) -> Self {
        Self {
            highest: Self::load_highest(storage),
            ..Self::new(policy)
        }
    }

    /// Reads the persisted highest score. A missing or non-numeric record is
    /// reset to 0.
    pub fn load_highest(storage: &mut dyn Storage) -> u64 {
        match storage
            .read(HIGHEST_SCORE_KEY)
            .and_then(|text| text.trim().parse::<u64>().ok())
        {
            Some(highest) => highest,
            None => {
                if let Err(err) = storage.write(HIGHEST_SCORE_KEY, "0") {
                    warn!(target: "score_tracker", "Could not initialise highest score: {}", err);
                }
                0
            }
        }
    }

    pub fn policy(&self) -> ScorePolicy {
        self.policy
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn highest(&self) -> u64 {
        self.highest
    }

    /// Starting score for a fresh board.
    pub fn reset(&mut self, board: &GameBoard) {
        self.score = match self.policy {
            ScorePolicy::MergeDeltas => 0,
            ScorePolicy::BoardSum => score_from_board(board),
        };
    }

    /// Restores a stored score (undo, reload). The stored value is
    /// authoritative even under [`ScorePolicy::BoardSum`].
    pub fn set_score(&mut self, score: u64) {
        self.score = score;
    }

    /// Updates the score after a settled move; returns the new score.
    pub fn apply(&mut self, merge_delta: u64, board: &GameBoard) -> u64 {
        self.score = match self.policy {
            ScorePolicy::MergeDeltas => self.score + merge_delta,
            // never step backwards, even if the board was restored from an older record
            ScorePolicy::BoardSum => self.score.max(score_from_board(board)),
        };
        self.score
    }

    /// Persists the current score as the highest iff it beats the stored
    /// value. Write failures are logged and otherwise ignored.
    pub fn record_if_highest(&mut self, storage: &mut dyn Storage) -> bool {
        if self.score <= self.highest {
            return false;
        }
        self.highest = self.score;
        info!(target: "score_tracker", "New highest score {}", self.highest);
        if let Err(err) = storage.write(HIGHEST_SCORE_KEY, &self.highest.to_string()) {
            warn!(target: "score_tracker", "Could not persist highest score: {}", err);
        }
        true
    }
}
