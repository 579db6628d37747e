use crate::config::Behavior;
use crate::fruit::FruitRegistry;
use crate::grid::{Cell, Grid, Window};
use crate::oracle::{Decision, Oracle, RelativeMove};
use crate::pos::Pos;
use rand::Rng;
use std::collections::VecDeque;

/// Neighbor scan order: east, west, south, north (row first). Ties among
/// equally valued moves resolve in this order.
pub const DIRECTIONS: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// An absolute move target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub target: Pos,
    pub eats: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Moved { eaten: bool },
    /// No legal move was left; the snake has already cleared its cells.
    Died { length: usize },
}

#[derive(Clone, Debug)]
pub struct Snake {
    id: u64,
    // Tail at the front, head at the back.
    body: VecDeque<Pos>,
    behavior: Behavior,
    window_radius: u16,
    last: Option<Decision>,
}

impl Snake {
    /// Drops a one-cell snake on a random empty cell.
    pub fn spawn<R: Rng>(id: u64, grid: &mut Grid, behavior: Behavior, window_radius: u16, rng: &mut R) -> Self {
        let head = grid.find_random_empty_point(rng);
        Self::from_body(id, [head], grid, behavior, window_radius)
    }

    /// Places a snake with the given cells, tail first, and marks them on the
    /// grid. The cells must be empty.
    pub fn from_body(
        id: u64,
        cells: impl IntoIterator<Item = Pos>,
        grid: &mut Grid,
        behavior: Behavior,
        window_radius: u16,
    ) -> Self {
        let body: VecDeque<Pos> = cells.into_iter().collect();
        assert!(!body.is_empty(), "a snake needs at least one cell");
        for (i, &p) in body.iter().enumerate() {
            debug_assert!(grid.is_empty(p), "snake {id} placed on occupied cell {p}");
            let cell = if i + 1 == body.len() { Cell::Head } else { Cell::Body };
            grid.set(p, cell);
        }
        Self { id, body, behavior, window_radius, last: None }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn head(&self) -> Pos {
        self.body[self.body.len() - 1]
    }

    pub fn tail(&self) -> Pos {
        self.body[0]
    }

    /// Cells from tail to head.
    pub fn body(&self) -> impl Iterator<Item = Pos> + '_ {
        self.body.iter().copied()
    }

    pub fn contains(&self, p: Pos) -> bool {
        self.body.iter().any(|&s| s == p)
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// The decision the Oracle will grade on this snake's next consult.
    pub fn last_decision(&self) -> Option<&Decision> {
        self.last.as_ref()
    }

    pub fn window(&self, grid: &Grid) -> Window {
        grid.window(self.head(), self.window_radius)
    }

    /// Legal moves as absolute targets and, index for index, as moves
    /// relative to the head.
    pub fn find_moves(&self, grid: &Grid) -> (Vec<Move>, Vec<RelativeMove>) {
        let head = self.head();
        let mut moves = Vec::with_capacity(DIRECTIONS.len());
        let mut relative = Vec::with_capacity(DIRECTIONS.len());
        for (dx, dy) in DIRECTIONS {
            let Some(target) = head.offset(dx, dy) else {
                continue;
            };
            let eats = match grid.get(target) {
                Cell::Empty => false,
                Cell::Fruit => true,
                _ => continue,
            };
            moves.push(Move { target, eats });
            relative.push(RelativeMove::new(dx, dy, eats));
        }
        (moves, relative)
    }

    /// Moves the head onto `mv.target`. A plain move slides the body; eating
    /// consumes the fruit and keeps the tail, growing by one.
    pub fn apply(&mut self, mv: Move, grid: &mut Grid, fruits: &mut FruitRegistry) {
        debug_assert!(!self.contains(mv.target), "snake {} moving into itself at {}", self.id, mv.target);
        let head = self.head();

        if mv.eats {
            let eaten = fruits.remove(grid, mv.target);
            debug_assert!(eaten.is_some(), "no fruit to eat at {}", mv.target);
            grid.set(head, Cell::Body);
            self.body.push_back(mv.target);
        } else {
            grid.set(self.tail(), Cell::Empty);
            if self.body.len() > 1 {
                grid.set(head, Cell::Body);
            }
            self.body.push_back(mv.target);
            self.body.pop_front();
        }
        grid.set(mv.target, Cell::Head);
    }

    /// Advances the snake by one move. Random snakes pick uniformly; oracle
    /// snakes ask the Oracle, which also grades their previous decision.
    pub fn tick<R: Rng>(
        &mut self,
        grid: &mut Grid,
        fruits: &mut FruitRegistry,
        oracle: &mut Oracle,
        rng: &mut R,
    ) -> TickOutcome {
        let (moves, relative) = self.find_moves(grid);

        let pick = match self.behavior {
            Behavior::Random => (!moves.is_empty()).then(|| rng.gen_range(0..moves.len())),
            Behavior::Oracle => {
                let window = self.window(grid);
                let pick = oracle.consult(&window, &relative, self.last.as_ref(), rng);
                if let Some(i) = pick {
                    self.last = Some(Decision::new(window, relative[i]));
                }
                pick
            }
        };

        match pick {
            Some(i) => {
                let mv = moves[i];
                self.apply(mv, grid, fruits);
                TickOutcome::Moved { eaten: mv.eats }
            }
            None => TickOutcome::Died { length: self.die(grid) },
        }
    }

    /// Frees every cell of the snake. Returns its final length.
    pub fn die(&mut self, grid: &mut Grid) -> usize {
        for &p in &self.body {
            grid.set(p, Cell::Empty);
        }
        tracing::debug!(id = self.id, length = self.body.len(), "snake died");
        self.body.len()
    }
}
