use crate::error::WindowShapeError;
use crate::pos::Pos;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What occupies a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Wall,
    Fruit,
    Body,
    Head,
}

impl Cell {
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Wall => '#',
            Cell::Fruit => '@',
            Cell::Body => '*',
            Cell::Head => '&',
        }
    }

    pub fn is_snake(self) -> bool {
        matches!(self, Cell::Body | Cell::Head)
    }
}

/// Square cell matrix with a permanent wall ring.
///
/// A grid built for side length `N` is `(N + 2) x (N + 2)`; rows and columns
/// `0` and `N + 1` are walls.
#[derive(Clone, Debug)]
pub struct Grid {
    side: u16,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(side_length: u16) -> Self {
        let side = side_length.saturating_add(2);
        let n = side as usize;
        let mut cells = vec![Cell::Empty; n * n];
        for i in 0..n {
            cells[i] = Cell::Wall;
            cells[(n - 1) * n + i] = Cell::Wall;
            cells[i * n] = Cell::Wall;
            cells[i * n + n - 1] = Cell::Wall;
        }
        Self { side, cells }
    }

    /// Full side including the border.
    pub fn side(&self) -> u16 {
        self.side
    }

    pub fn contains(&self, p: Pos) -> bool {
        p.x < self.side && p.y < self.side
    }

    fn index(&self, p: Pos) -> usize {
        p.x as usize * self.side as usize + p.y as usize
    }

    /// Cells outside the matrix read as walls.
    pub fn get(&self, p: Pos) -> Cell {
        if self.contains(p) {
            self.cells[self.index(p)]
        } else {
            Cell::Wall
        }
    }

    pub fn symbol_at(&self, p: Pos) -> char {
        self.get(p).symbol()
    }

    pub fn set(&mut self, p: Pos, cell: Cell) {
        debug_assert!(self.contains(p), "write outside grid at {p}");
        let i = self.index(p);
        self.cells[i] = cell;
    }

    pub fn is_empty(&self, p: Pos) -> bool {
        self.get(p) == Cell::Empty
    }

    pub fn is_fruit(&self, p: Pos) -> bool {
        self.get(p) == Cell::Fruit
    }

    pub fn is_border(&self, p: Pos) -> bool {
        p.x == 0 || p.y == 0 || p.x == self.side - 1 || p.y == self.side - 1
    }

    /// Rejection-samples uniform coordinates over the whole matrix, border
    /// included, until an empty cell turns up. Never returns on a full grid.
    pub fn find_random_empty_point<R: Rng>(&self, rng: &mut R) -> Pos {
        loop {
            let p = Pos::new(rng.gen_range(0..self.side), rng.gen_range(0..self.side));
            if self.is_empty(p) {
                return p;
            }
        }
    }

    /// Square view of radius `radius` centered on `center`.
    ///
    /// When the ideal square would cross the matrix edge, the radius shrinks
    /// uniformly to the largest value that fits on all four sides, so the
    /// window stays square and centered. In a corner this is a single cell.
    pub fn window(&self, center: Pos, radius: u16) -> Window {
        debug_assert!(self.contains(center));
        let last = self.side - 1;
        let r = [radius, center.x, center.y, last - center.x, last - center.y]
            .into_iter()
            .min()
            .unwrap_or(0);

        let width = 2 * r as usize + 1;
        let mut cells = Vec::with_capacity(width * width);
        for x in center.x - r..=center.x + r {
            for y in center.y - r..=center.y + r {
                cells.push(self.get(Pos::new(x, y)));
            }
        }
        Window { radius: r, cells }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.side as usize)
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Every coordinate holding `cell`.
    pub fn positions_of(&self, cell: Cell) -> impl Iterator<Item = Pos> + '_ {
        let side = self.side as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, c)| **c == cell)
            .map(move |(i, _)| Pos::new((i / side) as u16, (i % side) as u16))
    }
}

/// Clipped neighborhood around a snake head. Compared and hashed by content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct Window {
    radius: u16,
    cells: Vec<Cell>,
}

#[derive(Deserialize)]
struct RawWindow {
    radius: u16,
    cells: Vec<Cell>,
}

impl TryFrom<RawWindow> for Window {
    type Error = WindowShapeError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Window::try_from_cells(raw.radius, raw.cells)
    }
}

impl Window {
    /// Builds a window from row-major cells. Panics unless `cells.len()` is
    /// `(2r+1)^2`.
    pub fn from_cells(radius: u16, cells: Vec<Cell>) -> Self {
        match Self::try_from_cells(radius, cells) {
            Ok(window) => window,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_from_cells(radius: u16, cells: Vec<Cell>) -> Result<Self, WindowShapeError> {
        let width = 2 * radius as usize + 1;
        if cells.len() != width * width {
            return Err(WindowShapeError { radius, expected: width * width, found: cells.len() });
        }
        Ok(Self { radius, cells })
    }

    pub fn radius(&self) -> u16 {
        self.radius
    }

    pub fn width(&self) -> usize {
        2 * self.radius as usize + 1
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.width() + col]
    }

    pub fn center(&self) -> Cell {
        let r = self.radius as usize;
        self.get(r, r)
    }
}
