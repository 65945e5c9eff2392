use log::warn;
use serde::{Deserialize, Serialize};

use super::persistence::{Storage, GAME_STATS_KEY};
use crate::model::{GameStats, GlobalStats};

const MAX_HIGH_SCORES: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StatsRecord {
    #[serde(default)]
    scores: Vec<GameStats>,
    #[serde(default)]
    global_stats: GlobalStats,
}

#[derive(Debug, Default)]
pub struct StatsManager {
    record: StatsRecord,
}

impl StatsManager {
    pub fn load(storage: &dyn Storage) -> Self {
        let record = match storage.read(GAME_STATS_KEY) {
            Some(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(target: "stats_manager", "Discarding unreadable stats: {}", err);
                StatsRecord::default()
            }),
            None => StatsRecord::default(),
        };
        Self { record }
    }

    pub fn record_game(
        &mut self,
        stats: &GameStats,
        storage: &mut dyn Storage,
    ) -> std::io::Result<()> {
        let scores = &mut self.record.scores;
        scores.push(stats.clone());

        // Highest score first, quicker game breaks ties
        scores.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.completion_time.cmp(&b.completion_time))
        });
        scores.truncate(MAX_HIGH_SCORES);

        let global_stats = &mut self.record.global_stats;
        global_stats.total_games_played += 1;
        global_stats.total_moves += u64::from(stats.moves);
        global_stats.total_time_played += stats.completion_time;
        global_stats.best_tile = global_stats.best_tile.max(stats.highest_tile);

        let contents = serde_json::to_string_pretty(&self.record)?;
        storage.write(GAME_STATS_KEY, &contents)
    }

    pub fn get_high_scores(&self, limit: usize) -> Vec<GameStats> {
        self.record.scores.iter().take(limit).cloned().collect()
    }

    pub fn get_global_stats(&self) -> GlobalStats {
        self.record.global_stats.clone()
    }
}
