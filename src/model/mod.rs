mod board_snapshot;
mod cell;
mod direction;
mod error;
mod game_board;
mod game_engine_command;
mod game_engine_event;
mod game_stats;
mod move_outcome;
mod tile;
mod timer_state;

pub use board_snapshot::BoardSnapshot;
pub use cell::Cell;
pub use direction::Direction;
pub use error::GameError;
pub use game_board::{GameBoard, Line, CELL_COUNT, GRID_SIZE};
pub use game_engine_command::GameEngineCommand;
pub use game_engine_event::GameEngineEvent;
pub use game_stats::{GameStats, GlobalStats};
pub use move_outcome::MoveOutcome;
pub use tile::{Tile, TileId, TileMerge, TileSlide};
pub use timer_state::TimerState;
