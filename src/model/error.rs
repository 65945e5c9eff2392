use derive_more::{Display, Error};

use super::Direction;

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// Coordinate access outside the grid; a programming fault.
    #[display("cell ({x}, {y}) is outside the grid")]
    OutOfRange { x: usize, y: usize },
    /// Spawn requested with no empty cell left.
    #[display("cannot spawn a tile: the board is full")]
    BoardFull,
    /// Undo requested without a snapshot to roll back to.
    #[display("no earlier position to undo to")]
    NotAvailable,
    #[display("persisted state is corrupt: {_0}")]
    CorruptPersistedState(#[error(not(source))] String),
    #[display("a move is already in flight")]
    MoveInFlight,
    #[display("no move is in flight")]
    NoMoveInFlight,
    #[display("cannot move {_0}")]
    IllegalMove(#[error(not(source))] Direction),
    #[display("the game is over")]
    GameOver,
    #[display("unknown direction {_0:?}")]
    UnknownDirection(#[error(not(source))] String),
}
