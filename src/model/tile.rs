use serde::{Deserialize, Serialize};

/// Engine-assigned identity for a tile. A renderer keys its visual handle on
/// this; the engine never holds presentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub value: u32,
}

impl Tile {
    pub fn new(id: TileId, value: u32) -> Self {
        Self { id, value }
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, self.id)
    }
}

/// A tile travelling from one cell to another during the slide phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSlide {
    pub tile: TileId,
    pub from: (usize, usize),
    pub to: (usize, usize),
    /// Set when the destination already holds an equal tile; the pair is
    /// combined during settle.
    pub merging: bool,
}

/// Two tiles folded together during settle. `survivor` keeps its identity
/// and now carries `value`; `absorbed` no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMerge {
    pub survivor: TileId,
    pub absorbed: TileId,
    pub x: usize,
    pub y: usize,
    pub value: u32,
}
