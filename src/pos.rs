use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate. `x` is the row, `y` is the column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub x: u16,
    pub y: u16,
}

impl Pos {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Neighbor at `(dx, dy)`, or `None` if it would leave the `u16` range.
    pub fn offset(self, dx: i8, dy: i8) -> Option<Pos> {
        let x = self.x.checked_add_signed(dx as i16)?;
        let y = self.y.checked_add_signed(dy as i16)?;
        Some(Pos::new(x, y))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
