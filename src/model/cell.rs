use super::{Tile, TileMerge};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    x: usize,
    y: usize,
    tile: Option<Tile>,
    merge_tile: Option<Tile>,
}

impl Cell {
    pub fn new(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            tile: None,
            merge_tile: None,
        }
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn tile(&self) -> Option<Tile> {
        self.tile
    }

    pub fn value(&self) -> Option<u32> {
        self.tile.map(|tile| tile.value)
    }

    pub fn merge_tile(&self) -> Option<Tile> {
        self.merge_tile
    }

    pub fn is_empty(&self) -> bool {
        self.tile.is_none()
    }

    pub(crate) fn set_tile(&mut self, tile: Option<Tile>) {
        self.tile = tile;
    }

    pub(crate) fn take_tile(&mut self) -> Option<Tile> {
        self.tile.take()
    }

    pub(crate) fn set_merge_tile(&mut self, tile: Tile) {
        debug_assert!(self.merge_tile.is_none());
        self.merge_tile = Some(tile);
    }

    pub(crate) fn clear(&mut self) {
        self.tile = None;
        self.merge_tile = None;
    }

    /// Empty, or holding an equal value with no merge partner yet.
    pub fn can_accept(&self, tile: &Tile) -> bool {
        match self.tile {
            None => true,
            Some(resident) => self.merge_tile.is_none() && resident.value == tile.value,
        }
    }

    /// Folds a pending merge partner into the settled tile.
    pub(crate) fn merge_tiles(&mut self) -> Option<TileMerge> {
        let partner = self.merge_tile.take()?;
        match self.tile.as_mut() {
            Some(resident) => {
                resident.value += partner.value;
                Some(TileMerge {
                    survivor: resident.id,
                    absorbed: partner.id,
                    x: self.x,
                    y: self.y,
                    value: resident.value,
                })
            }
            None => {
                self.tile = Some(partner);
                None
            }
        }
    }
}
