//! Consistency failures between the grid and what snakes and fruit record.
//!
//! Any of these means a move was applied wrongly; they are bugs, not
//! recoverable conditions.

use crate::grid::Cell;
use crate::pos::Pos;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("border cell {pos} holds {found:?} instead of a wall")]
    Border { pos: Pos, found: Cell },

    #[error("snake {id} expects {expected:?} at {pos} but the grid holds {found:?}")]
    SnakeCell {
        id: u64,
        pos: Pos,
        expected: Cell,
        found: Cell,
    },

    #[error("cell {pos} is claimed by snakes {first} and {second}")]
    Overlap { pos: Pos, first: u64, second: u64 },

    #[error("grid holds {on_grid} snake cells but snakes record {recorded}")]
    StraySnakeCells { on_grid: usize, recorded: usize },

    #[error("fruit at {pos} is drawn as {found:?}")]
    FruitCell { pos: Pos, found: Cell },

    #[error("grid holds {on_grid} fruit cells but the registry tracks {registered}")]
    StrayFruit { on_grid: usize, registered: usize },
}

/// A window whose cell list cannot fill a `(2r+1)` square, e.g. from a
/// damaged model file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("window of radius {radius} needs {expected} cells, got {found}")]
pub struct WindowShapeError {
    pub radius: u16,
    pub expected: usize,
    pub found: usize,
}
