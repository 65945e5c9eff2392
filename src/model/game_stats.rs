use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Summary of one finished playthrough.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct GameStats {
    pub score: u64,
    pub highest_tile: u32,
    pub moves: u32,
    pub completion_time: Duration,
    pub timestamp: i64,
    pub playthrough_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GlobalStats {
    pub total_games_played: u32,
    pub total_moves: u64,
    pub total_time_played: Duration,
    pub best_tile: u32,
}
