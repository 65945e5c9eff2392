pub mod game_engine;
pub mod history;
pub mod move_engine;
pub mod persistence;
pub mod score_tracker;
pub mod settings;
pub mod stats_manager;

pub use game_engine::GameEngine;
pub use history::MoveHistory;
pub use persistence::{FileStorage, MemoryStorage, Storage};
pub use score_tracker::{score_from_board, ScorePolicy, ScoreTracker};
pub use settings::Settings;
pub use stats_manager::StatsManager;
