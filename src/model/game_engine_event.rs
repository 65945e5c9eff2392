use super::{Cell, GameBoard, GameStats, MoveOutcome, TileMerge};

#[derive(Debug, Clone)]
pub enum GameEngineEvent {
    TileSpawned(Cell),
    /// Slide phase done; tiles listed in the outcome are in transition.
    TilesSlid(MoveOutcome),
    TilesMerged(Vec<TileMerge>),
    ScoreChanged {
        score: u64,
        delta: u64,
    },
    HighestScoreChanged(u64),
    HistoryChanged {
        available_undos: usize,
    },
    /// The whole board was replaced (new game, undo, restore).
    BoardReset(GameBoard),
    InputSuspended(bool),
    GameOver(GameStats),
}
