use serde::{Deserialize, Serialize};

use super::{GameBoard, GameError};

/// An owned, order-preserving copy of the board values (row-major, 0 for
/// empty) together with the score at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub cells: Vec<u32>,
    pub score: u64,
}

impl BoardSnapshot {
    pub fn capture(board: &GameBoard, score: u64) -> Self {
        Self {
            cells: board.values(),
            score,
        }
    }

    pub fn to_board(&self) -> Result<GameBoard, GameError> {
        GameBoard::from_values(&self.cells)
    }
}
