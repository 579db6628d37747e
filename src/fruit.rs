use crate::grid::{Cell, Grid};
use crate::pos::Pos;
use ahash::AHashMap;
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fruit {
    pub pos: Pos,
    /// Frame the fruit was planted on.
    pub planted: u64,
}

/// Active fruit, keyed by position.
#[derive(Clone, Debug, Default)]
pub struct FruitRegistry {
    fruits: AHashMap<Pos, Fruit>,
}

impl FruitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fruits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fruits.is_empty()
    }

    pub fn contains(&self, p: Pos) -> bool {
        self.fruits.contains_key(&p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fruit> + '_ {
        self.fruits.values()
    }

    /// Plants a fruit at a random empty cell and marks it on the grid.
    pub fn spawn<R: Rng>(&mut self, grid: &mut Grid, frame: u64, rng: &mut R) -> Pos {
        let pos = grid.find_random_empty_point(rng);
        grid.set(pos, Cell::Fruit);
        self.fruits.insert(pos, Fruit { pos, planted: frame });
        tracing::trace!(%pos, frame, "fruit planted");
        pos
    }

    /// Removes the fruit at `pos` and clears its cell.
    pub fn remove(&mut self, grid: &mut Grid, pos: Pos) -> Option<Fruit> {
        let fruit = self.fruits.remove(&pos)?;
        debug_assert_eq!(grid.get(pos), Cell::Fruit, "fruit at {pos} lost its marker");
        grid.set(pos, Cell::Empty);
        Some(fruit)
    }

    /// Removes one uniformly chosen fruit.
    pub fn remove_random<R: Rng>(&mut self, grid: &mut Grid, rng: &mut R) -> Option<Fruit> {
        if self.fruits.is_empty() {
            return None;
        }
        let i = rng.gen_range(0..self.fruits.len());
        let pos = *self.fruits.keys().nth(i)?;
        let fruit = self.remove(grid, pos);
        tracing::trace!(%pos, "fruit culled");
        fruit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn spawn_marks_grid_and_registers() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut grid = Grid::new(6);
        let mut fruits = FruitRegistry::new();

        let pos = fruits.spawn(&mut grid, 4, &mut rng);
        assert!(grid.is_fruit(pos));
        assert!(fruits.contains(pos));
        assert_eq!(fruits.iter().next().map(|f| f.planted), Some(4));
        assert_eq!(grid.count(Cell::Fruit), 1);
    }

    #[test]
    fn remove_clears_cell() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut grid = Grid::new(6);
        let mut fruits = FruitRegistry::new();
        let a = fruits.spawn(&mut grid, 0, &mut rng);
        let b = fruits.spawn(&mut grid, 0, &mut rng);
        assert_ne!(a, b);

        assert!(fruits.remove(&mut grid, a).is_some());
        assert!(grid.is_empty(a));
        assert!(grid.is_fruit(b));
        assert_eq!(fruits.len(), 1);
        assert!(fruits.remove(&mut grid, a).is_none());
    }

    #[test]
    fn remove_random_takes_exactly_one() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut grid = Grid::new(10);
        let mut fruits = FruitRegistry::new();
        for _ in 0..5 {
            fruits.spawn(&mut grid, 0, &mut rng);
        }
        let gone = fruits.remove_random(&mut grid, &mut rng).map(|f| f.pos);
        assert!(gone.is_some_and(|p| grid.is_empty(p)));
        assert_eq!(fruits.len(), 4);
        assert_eq!(grid.count(Cell::Fruit), 4);

        let mut empty = FruitRegistry::new();
        assert!(empty.remove_random(&mut grid, &mut rng).is_none());
    }
}
