//! Snakes foraging on a walled grid, steered by a shared Q-learning Oracle.
//!
//! A [`Board`] owns the grid, the fruit, the snakes and the [`Oracle`]. Each
//! [`Board::tick`] moves every snake once in random order, tends the fruit
//! supply and refills the population. Snakes in [`Behavior::Oracle`] mode
//! hand their local [`Window`] and legal moves to the Oracle, which picks a
//! move and updates the value of the snake's previous decision.

pub mod board;
pub mod config;
pub mod diagnostics;
pub mod draw;
pub mod error;
pub mod fruit;
pub mod grid;
pub mod model;
pub mod oracle;
pub mod pos;
pub mod snake;

pub use board::Board;
pub use config::{Behavior, BoardConfig, InitValue, LearningConfig, SimConfig};
pub use error::{InvariantViolation, WindowShapeError};
pub use grid::{Cell, Grid, Window};
pub use oracle::{Decision, Oracle, QTable, RelativeMove};
pub use pos::Pos;
pub use snake::{Snake, TickOutcome};
