use std::time::{Duration, SystemTime};

use serde_with::serde_as;
use serde_with::TimestampSeconds;

/// Wall-clock span of one playthrough.
#[serde_as]
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TimerState {
    #[serde_as(as = "TimestampSeconds")]
    pub started_timestamp: SystemTime,
    #[serde_as(as = "Option<TimestampSeconds>")]
    pub ended_timestamp: Option<SystemTime>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::started_at(SystemTime::now())
    }
}

impl TimerState {
    pub fn started_at(now: SystemTime) -> Self {
        Self {
            started_timestamp: now,
            ended_timestamp: None,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended_timestamp.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        let until_time = self.ended_timestamp.unwrap_or(SystemTime::now());

        until_time
            .duration_since(self.started_timestamp)
            .unwrap_or_default()
    }

    pub fn ended(&self, now: SystemTime) -> TimerState {
        let mut new_state = self.clone();
        new_state.ended_timestamp.get_or_insert(now);
        new_state
    }
}
