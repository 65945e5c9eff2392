//! Slide, merge and legality rules.
//!
//! A move runs in two phases. [`slide_tiles`] walks every line of the
//! requested direction and moves each tile as far toward the edge as the
//! cells in front of it accept; a tile that reaches an equal tile is parked
//! on that cell as its pending merge partner rather than combined. Once all
//! slides have settled, [`merge_tiles`] folds every pending partner into its
//! resident. Keeping the phases apart is what stops a freshly merged tile
//! from merging a second time in the same move.

use log::{debug, trace};

use crate::model::{Direction, GameBoard, GameError, MoveOutcome, TileMerge, TileSlide};

/// Cheap one-step lookahead: some tile has a neighbour toward the edge that
/// would accept it.
pub fn can_move_in_direction(board: &GameBoard, direction: Direction) -> bool {
    GameBoard::lines(direction).iter().any(|line| {
        line.windows(2).any(|pair| {
            let (to, from) = (board.cell(pair[0]), board.cell(pair[1]));
            match from.tile() {
                Some(tile) => to.can_accept(&tile),
                None => false,
            }
        })
    })
}

pub fn legal_directions(board: &GameBoard) -> Vec<Direction> {
    Direction::all()
        .into_iter()
        .filter(|&direction| can_move_in_direction(board, direction))
        .collect()
}

/// No direction is legal.
pub fn is_game_over(board: &GameBoard) -> bool {
    Direction::all()
        .into_iter()
        .all(|direction| !can_move_in_direction(board, direction))
}

/// Slide phase. Moves tiles toward the edge of `direction`, parking equal
/// arrivals as pending merges. Returns one entry per tile that moved.
pub fn slide_tiles(board: &mut GameBoard, direction: Direction) -> Vec<TileSlide> {
    let mut slides = Vec::new();
    for line in GameBoard::lines(direction) {
        for i in 1..line.len() {
            let source = line[i];
            let Some(tile) = board.cell(source).tile() else {
                continue;
            };

            let mut target = None;
            for &candidate in line[..i].iter().rev() {
                if !board.cell(candidate).can_accept(&tile) {
                    break;
                }
                target = Some(candidate);
            }
            let Some(target) = target else {
                continue;
            };

            board.cell_mut(source).take_tile();
            let destination = board.cell_mut(target);
            let merging = !destination.is_empty();
            if merging {
                destination.set_merge_tile(tile);
            } else {
                destination.set_tile(Some(tile));
            }
            trace!(
                target: "move_engine",
                "{:?} {:?} -> {:?}{}",
                tile,
                source,
                target,
                if merging { " (merge)" } else { "" }
            );
            slides.push(TileSlide {
                tile: tile.id,
                from: source,
                to: target,
                merging,
            });
        }
    }
    slides
}

/// Finalize phase. Sums every pending merge and clears the partner slot.
pub fn merge_tiles(board: &mut GameBoard) -> Vec<TileMerge> {
    board
        .cells_mut()
        .filter_map(|cell| cell.merge_tiles())
        .collect()
}

pub fn merge_score(merges: &[TileMerge]) -> u64 {
    merges.iter().map(|merge| u64::from(merge.value)).sum()
}

/// Runs both phases back to back. Rejects an illegal direction without
/// touching the board. Spawning is left to the caller.
pub fn apply(board: &mut GameBoard, direction: Direction) -> Result<MoveOutcome, GameError> {
    if !can_move_in_direction(board, direction) {
        return Err(GameError::IllegalMove(direction));
    }
    let mut outcome = MoveOutcome::new(direction);
    outcome.slides = slide_tiles(board, direction);
    outcome.merges = merge_tiles(board);
    outcome.score_delta = merge_score(&outcome.merges);
    debug!(
        target: "move_engine",
        "Moved {}: {} slides, {} merges, +{}",
        direction,
        outcome.slides.len(),
        outcome.merges.len(),
        outcome.score_delta
    );
    Ok(outcome)
}
