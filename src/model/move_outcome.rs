use serde::{Deserialize, Serialize};

use super::{Direction, TileMerge, TileSlide};

/// Everything a renderer needs to animate one move: which tiles slid where
/// and, once settled, which pairs merged and the points they earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub direction: Direction,
    pub slides: Vec<TileSlide>,
    pub merges: Vec<TileMerge>,
    pub score_delta: u64,
}

impl MoveOutcome {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            slides: Vec::new(),
            merges: Vec::new(),
            score_delta: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}
