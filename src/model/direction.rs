use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::GameError;

/// One of the four logical move directions. The presentation layer resolves
/// key presses and swipes into one of these; the engine never sees raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
    }

    /// Resolves a swipe displacement to a direction using the dominant axis.
    /// Returns `None` for a zero-length gesture.
    pub fn from_displacement(dx: f64, dy: f64) -> Option<Direction> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        if dx.abs() > dy.abs() {
            Some(if dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            })
        } else {
            Some(if dy > 0.0 {
                Direction::Down
            } else {
                Direction::Up
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Direction {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "arrowup" => Ok(Direction::Up),
            "down" | "arrowdown" => Ok(Direction::Down),
            "left" | "arrowleft" => Ok(Direction::Left),
            "right" | "arrowright" => Ok(Direction::Right),
            other => Err(GameError::UnknownDirection(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_arrow_key_names() {
        assert_eq!("ArrowUp".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("left".parse::<Direction>().unwrap(), Direction::Left);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_dominant_axis_wins() {
        assert_eq!(
            Direction::from_displacement(30.0, -5.0),
            Some(Direction::Right)
        );
        assert_eq!(
            Direction::from_displacement(-2.0, -40.0),
            Some(Direction::Up)
        );
        assert_eq!(Direction::from_displacement(0.0, 0.0), None);
    }
}
