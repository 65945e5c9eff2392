use itertools::Itertools;
use log::trace;
use rand::Rng;

use super::{Cell, Direction, GameError, Tile, TileId};

pub const GRID_SIZE: usize = 4;
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// Coordinates `(x, y)` of one line, index 0 being the edge tiles slide toward.
pub type Line = [(usize, usize); GRID_SIZE];

#[derive(Clone, PartialEq, Eq)]
pub struct GameBoard {
    cells: Vec<Cell>, // row-major
    next_tile_id: u64,
}

impl std::fmt::Debug for GameBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = String::from("\n");
        for row in self.cells.chunks(GRID_SIZE) {
            let line = row
                .iter()
                .map(|cell| match (cell.value(), cell.merge_tile()) {
                    (Some(value), Some(partner)) => format!("{}+{}", value, partner.value),
                    (Some(value), None) => value.to_string(),
                    (None, _) => ".".to_string(),
                })
                .map(|text| format!("{:>6}", text))
                .join("|");
            output.push_str(&line);
            output.push('\n');
        }
        write!(f, "{}", output)
    }
}

impl Default for GameBoard {
    fn default() -> Self {
        let cells = (0..CELL_COUNT)
            .map(|index| Cell::new(index % GRID_SIZE, index / GRID_SIZE))
            .collect();
        Self {
            cells,
            next_tile_id: 0,
        }
    }
}

impl GameBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a board from a row-major value list (0 = empty). Tiles get
    /// fresh ids.
    pub fn from_values(values: &[u32]) -> Result<Self, GameError> {
        if values.len() != CELL_COUNT {
            return Err(GameError::CorruptPersistedState(format!(
                "expected {} cells, found {}",
                CELL_COUNT,
                values.len()
            )));
        }
        let mut board = Self::default();
        for (index, &value) in values.iter().enumerate() {
            if value > 0 {
                board.place_tile(index % GRID_SIZE, index / GRID_SIZE, value)?;
            }
        }
        Ok(board)
    }

    /// Row-major snapshot of settled values, 0 for empty cells.
    pub fn values(&self) -> Vec<u32> {
        self.cells
            .iter()
            .map(|cell| cell.value().unwrap_or(0))
            .collect()
    }

    fn index_of(x: usize, y: usize) -> Result<usize, GameError> {
        if x >= GRID_SIZE || y >= GRID_SIZE {
            return Err(GameError::OutOfRange { x, y });
        }
        Ok(y * GRID_SIZE + x)
    }

    pub fn cell_at(&self, x: usize, y: usize) -> Result<&Cell, GameError> {
        Ok(&self.cells[Self::index_of(x, y)?])
    }

    pub(crate) fn cell_at_mut(&mut self, x: usize, y: usize) -> Result<&mut Cell, GameError> {
        let index = Self::index_of(x, y)?;
        Ok(&mut self.cells[index])
    }

    /// Direct access for coordinates produced by [`GameBoard::lines`].
    pub(crate) fn cell(&self, (x, y): (usize, usize)) -> &Cell {
        &self.cells[y * GRID_SIZE + x]
    }

    pub(crate) fn cell_mut(&mut self, (x, y): (usize, usize)) -> &mut Cell {
        &mut self.cells[y * GRID_SIZE + x]
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }

    pub fn row_view(&self, row: usize) -> Result<Vec<&Cell>, GameError> {
        (0..GRID_SIZE).map(|x| self.cell_at(x, row)).collect()
    }

    pub fn column_view(&self, column: usize) -> Result<Vec<&Cell>, GameError> {
        (0..GRID_SIZE).map(|y| self.cell_at(column, y)).collect()
    }

    /// The lines for `direction`: columns for up, reversed columns for down,
    /// rows for left, reversed rows for right.
    pub fn lines(direction: Direction) -> Vec<Line> {
        (0..GRID_SIZE)
            .map(|major| {
                std::array::from_fn(|minor| match direction {
                    Direction::Up => (major, minor),
                    Direction::Down => (major, GRID_SIZE - 1 - minor),
                    Direction::Left => (minor, major),
                    Direction::Right => (GRID_SIZE - 1 - minor, major),
                })
            })
            .collect()
    }

    pub fn empty_cells(&self) -> Vec<&Cell> {
        self.cells.iter().filter(|cell| cell.is_empty()).collect()
    }

    pub fn occupied_cells(&self) -> Vec<&Cell> {
        self.cells.iter().filter(|cell| !cell.is_empty()).collect()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    pub fn has_pending_merges(&self) -> bool {
        self.cells.iter().any(|cell| cell.merge_tile().is_some())
    }

    pub fn highest_tile(&self) -> u32 {
        self.cells
            .iter()
            .filter_map(|cell| cell.value())
            .max()
            .unwrap_or(0)
    }

    pub fn tile_sum(&self) -> u64 {
        self.cells
            .iter()
            .filter_map(|cell| cell.value())
            .map(u64::from)
            .sum()
    }

    fn next_id(&mut self) -> TileId {
        let id = TileId(self.next_tile_id);
        self.next_tile_id += 1;
        id
    }

    /// Puts a new tile with `value` at `(x, y)`, replacing any resident.
    pub fn place_tile(&mut self, x: usize, y: usize, value: u32) -> Result<Tile, GameError> {
        let id = self.next_id();
        let cell = self.cell_at_mut(x, y)?;
        let tile = Tile::new(id, value);
        cell.set_tile(Some(tile));
        Ok(tile)
    }

    /// Picks a uniformly random empty cell and gives it a 4 with
    /// `four_probability`, otherwise a 2.
    pub fn spawn_random_tile<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        four_probability: f64,
    ) -> Result<Cell, GameError> {
        let empty: Vec<(usize, usize)> = self
            .empty_cells()
            .iter()
            .map(|cell| (cell.x(), cell.y()))
            .collect();
        if empty.is_empty() {
            return Err(GameError::BoardFull);
        }
        let (x, y) = empty[rng.random_range(0..empty.len())];
        let value = if rng.random_bool(four_probability.clamp(0.0, 1.0)) {
            4
        } else {
            2
        };
        self.place_tile(x, y, value)?;
        trace!(target: "game_board", "Spawned {} at ({}, {})", value, x, y);
        Ok(self.cell_at(x, y)?.clone())
    }

    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.clear();
        }
        self.next_tile_id = 0;
    }
}
