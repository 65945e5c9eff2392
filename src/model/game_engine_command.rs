use super::{BoardSnapshot, Direction, TileId};

#[derive(Debug, Clone)]
pub enum GameEngineCommand {
    Move(Direction),
    /// The renderer finished animating one slid tile.
    TransitionEnded(TileId),
    /// Skip waiting on outstanding transitions and settle now.
    Settle,
    Undo,
    NewGame,
    Restore,
    LoadState(Vec<BoardSnapshot>),
}
