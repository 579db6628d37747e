use crate::config::SimConfig;
use crate::draw;
use crate::error::InvariantViolation;
use crate::fruit::FruitRegistry;
use crate::grid::{Cell, Grid};
use crate::oracle::Oracle;
use crate::pos::Pos;
use crate::snake::{Snake, TickOutcome};
use ahash::AHashMap;
use anyhow::Result;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Fruit kept on the board per living snake.
const FRUIT_PER_SNAKE: usize = 2;
/// Below target, plant at most once every this many frames.
const PLANT_EVERY: u64 = 5;
/// At or above target, reshuffle one fruit every this many frames.
const CHURN_EVERY: u64 = 10;

/// The world: grid, fruit, snakes and the Oracle they share.
pub struct Board {
    config: SimConfig,
    grid: Grid,
    fruits: FruitRegistry,
    snakes: Vec<Snake>,
    oracle: Oracle,
    rng: SmallRng,
    frame: u64,
    next_id: u64,
    dead_lengths: Vec<usize>,
}

impl Board {
    /// Builds a board and spawns the initial snakes. Fails on an invalid
    /// configuration.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let oracle = Oracle::new(config.learning.clone())?;
        let mut board = Self {
            grid: Grid::new(config.board.side_length),
            fruits: FruitRegistry::new(),
            snakes: Vec::with_capacity(config.board.initial_snakes),
            oracle,
            rng,
            frame: 0,
            next_id: 0,
            dead_lengths: Vec::new(),
            config,
        };
        for _ in 0..board.config.board.initial_snakes {
            board.add_snake();
        }
        Ok(board)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn fruits(&self) -> &FruitRegistry {
        &self.fruits
    }

    pub fn snakes(&self) -> &[Snake] {
        &self.snakes
    }

    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut Oracle {
        &mut self.oracle
    }

    /// Swaps in another Oracle, e.g. one restored from disk.
    pub fn replace_oracle(&mut self, oracle: Oracle) -> Oracle {
        std::mem::replace(&mut self.oracle, oracle)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Final lengths of every snake that has died, oldest first.
    pub fn dead_lengths(&self) -> &[usize] {
        &self.dead_lengths
    }

    pub fn mean_dead_length(&self) -> Option<f64> {
        if self.dead_lengths.is_empty() {
            return None;
        }
        let total: usize = self.dead_lengths.iter().sum();
        Some(total as f64 / self.dead_lengths.len() as f64)
    }

    pub fn is_empty(&self, p: Pos) -> bool {
        self.grid.is_empty(p)
    }

    pub fn is_fruit(&self, p: Pos) -> bool {
        self.grid.is_fruit(p)
    }

    pub fn find_empty_point(&mut self) -> Pos {
        self.grid.find_random_empty_point(&mut self.rng)
    }

    /// Symbol snapshot of the grid for renderers.
    pub fn drawing(&self) -> Vec<Vec<char>> {
        draw::drawing(&self.grid)
    }

    pub fn render_text(&self) -> String {
        draw::render_text(&self.grid)
    }

    /// Adds a one-cell snake at a random empty cell.
    pub fn add_snake(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let snake = Snake::spawn(
            id,
            &mut self.grid,
            self.config.board.behavior,
            self.config.board.window_radius,
            &mut self.rng,
        );
        self.snakes.push(snake);
        id
    }

    /// Places a snake on the given cells, tail first.
    pub fn add_snake_at(&mut self, cells: impl IntoIterator<Item = Pos>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let snake = Snake::from_body(
            id,
            cells,
            &mut self.grid,
            self.config.board.behavior,
            self.config.board.window_radius,
        );
        self.snakes.push(snake);
        id
    }

    pub fn plant_fruit(&mut self) -> Pos {
        self.fruits.spawn(&mut self.grid, self.frame, &mut self.rng)
    }

    /// Advances the world by one frame.
    ///
    /// Snakes move once each in a fresh random order; a snake out of moves
    /// dies on the spot and its cells free up for the snakes after it. Then
    /// fruit is topped up or churned, and one replacement snake spawns if
    /// the population has fallen below its initial size.
    pub fn tick(&mut self) {
        let mut order: Vec<usize> = (0..self.snakes.len()).collect();
        order.shuffle(&mut self.rng);

        let mut dead = vec![false; self.snakes.len()];
        for i in order {
            let outcome = self.snakes[i].tick(&mut self.grid, &mut self.fruits, &mut self.oracle, &mut self.rng);
            if let TickOutcome::Died { length } = outcome {
                dead[i] = true;
                self.dead_lengths.push(length);
            }
            if self.config.board.self_check {
                self.self_check_except(&dead);
            }
        }
        let mut flags = dead.into_iter();
        self.snakes.retain(|_| !flags.next().unwrap_or(false));

        self.tend_fruit();

        if self.snakes.len() < self.config.board.initial_snakes {
            let id = self.add_snake();
            tracing::debug!(id, frame = self.frame, "replacement snake spawned");
        }

        if self.config.board.self_check {
            self.assert_invariants();
        }
        self.frame += 1;
    }

    pub fn run(&mut self, frames: u64) {
        for _ in 0..frames {
            self.tick();
        }
    }

    fn tend_fruit(&mut self) {
        if self.snakes.is_empty() {
            return;
        }
        let target = self.snakes.len() * FRUIT_PER_SNAKE;
        if self.fruits.len() < target {
            if self.frame % PLANT_EVERY == 0 {
                self.plant_fruit();
            }
        } else if self.frame % CHURN_EVERY == 0 {
            if self.rng.gen_bool(0.5) {
                self.fruits.remove_random(&mut self.grid, &mut self.rng);
            } else {
                self.plant_fruit();
            }
        }
    }

    /// Checks that the grid agrees with every snake and fruit record.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.check_with(&vec![false; self.snakes.len()])
    }

    fn check_with(&self, skip: &[bool]) -> Result<(), InvariantViolation> {
        let last = self.grid.side() - 1;
        for i in 0..=last {
            for p in [Pos::new(0, i), Pos::new(last, i), Pos::new(i, 0), Pos::new(i, last)] {
                let found = self.grid.get(p);
                if found != Cell::Wall {
                    return Err(InvariantViolation::Border { pos: p, found });
                }
            }
        }

        let mut owners: AHashMap<Pos, u64> = AHashMap::new();
        let mut recorded = 0;
        for (snake, _) in self.snakes.iter().zip(skip).filter(|(_, dead)| !**dead) {
            let head = snake.head();
            for p in snake.body() {
                let expected = if p == head { Cell::Head } else { Cell::Body };
                let found = self.grid.get(p);
                if found != expected {
                    return Err(InvariantViolation::SnakeCell { id: snake.id(), pos: p, expected, found });
                }
                if let Some(first) = owners.insert(p, snake.id()) {
                    return Err(InvariantViolation::Overlap { pos: p, first, second: snake.id() });
                }
            }
            recorded += snake.len();
        }
        let on_grid = self.grid.count(Cell::Body) + self.grid.count(Cell::Head);
        if on_grid != recorded {
            return Err(InvariantViolation::StraySnakeCells { on_grid, recorded });
        }

        for fruit in self.fruits.iter() {
            let found = self.grid.get(fruit.pos);
            if found != Cell::Fruit {
                return Err(InvariantViolation::FruitCell { pos: fruit.pos, found });
            }
        }
        let on_grid = self.grid.count(Cell::Fruit);
        if on_grid != self.fruits.len() {
            return Err(InvariantViolation::StrayFruit { on_grid, registered: self.fruits.len() });
        }
        Ok(())
    }

    fn self_check_except(&self, dead: &[bool]) {
        if let Err(err) = self.check_with(dead) {
            panic!("board invariant broken at frame {}: {err}\n{}", self.frame, self.render_text());
        }
    }

    /// Panics with a full grid dump if [`Board::check_invariants`] fails.
    pub fn assert_invariants(&self) {
        self.self_check_except(&vec![false; self.snakes.len()]);
    }
}
