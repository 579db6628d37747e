//! The Oracle: a tabular Q-learning service shared by every snake on a board.
//!
//! States are perception windows and actions are relative moves, so a value
//! learned in one corner of the board applies wherever the same neighborhood
//! shows up again. The update for a decision is applied one consult later,
//! once its reward and successor state are known.

use crate::config::{InitValue, LearningConfig};
use crate::grid::Window;
use ahash::{AHashMap, AHashSet};
use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A move relative to the head, tagged with whether it eats a fruit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelativeMove {
    pub dx: i8,
    pub dy: i8,
    pub eats: bool,
}

impl RelativeMove {
    pub fn new(dx: i8, dy: i8, eats: bool) -> Self {
        Self { dx, dy, eats }
    }
}

/// A state-action pair: the value-table key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decision {
    pub window: Window,
    pub relative_move: RelativeMove,
}

impl Decision {
    pub fn new(window: Window, relative_move: RelativeMove) -> Self {
        Self { window, relative_move }
    }
}

/// Q-values keyed by decision. Grows without eviction.
#[derive(Clone, Debug, Default)]
pub struct QTable {
    values: AHashMap<Decision, f32>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, decision: &Decision) -> Option<f32> {
        self.values.get(decision).copied()
    }

    pub fn insert(&mut self, decision: Decision, value: f32) -> Option<f32> {
        self.values.insert(decision, value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Decision, f32)> + '_ {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    /// The backing map as a plain `HashMap`, for rayon.
    pub(crate) fn map(&self) -> &HashMap<Decision, f32, ahash::RandomState> {
        &self.values
    }

    fn value_or_init<R: Rng>(&mut self, decision: &Decision, init: InitValue, rng: &mut R) -> &mut f32 {
        self.values
            .entry(decision.clone())
            .or_insert_with(|| sample_init(init, rng))
    }
}

impl FromIterator<(Decision, f32)> for QTable {
    fn from_iter<I: IntoIterator<Item = (Decision, f32)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

fn sample_init<R: Rng>(init: InitValue, rng: &mut R) -> f32 {
    match init {
        InitValue::Zero => 0.0,
        InitValue::Uniform { low, high } => rng.gen_range(low..=high),
    }
}

pub struct Oracle {
    params: LearningConfig,
    q: QTable,
    visits: AHashMap<Window, u64>,
    transitions: AHashMap<Decision, AHashMap<Decision, u64>>,
    predecessors: AHashMap<Decision, AHashSet<Decision>>,
    consults: u64,
    updates: u64,
}

impl Oracle {
    pub fn new(params: LearningConfig) -> Result<Self> {
        Self::with_table(params, QTable::new())
    }

    /// Starts from an existing table, e.g. one loaded from disk. Fails when
    /// `params` do not validate.
    pub fn with_table(params: LearningConfig, q: QTable) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            q,
            visits: AHashMap::new(),
            transitions: AHashMap::new(),
            predecessors: AHashMap::new(),
            consults: 0,
            updates: 0,
        })
    }

    pub fn params(&self) -> &LearningConfig {
        &self.params
    }

    pub fn table(&self) -> &QTable {
        &self.q
    }

    pub fn table_mut(&mut self) -> &mut QTable {
        &mut self.q
    }

    pub fn into_table(self) -> QTable {
        self.q
    }

    /// Number of consults served so far.
    pub fn consults(&self) -> u64 {
        self.consults
    }

    /// Number of value updates applied so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Picks one of `moves` for a snake seeing `window` and learns from the
    /// snake's previous decision.
    ///
    /// Unseen `(window, move)` pairs are initialized from the configured prior
    /// and stored right away. The greedy pick is the first move holding the
    /// maximum value. The previous decision, if any, is moved towards
    /// `reward + gamma * max_a Q(window, a)`, where the reward belongs to the
    /// greedy move: the eat bonus, the alive reward, or the death penalty
    /// when `moves` is empty. Returns `None` in that last case; the
    /// snake must die.
    pub fn consult<R: Rng>(
        &mut self,
        window: &Window,
        moves: &[RelativeMove],
        previous: Option<&Decision>,
        rng: &mut R,
    ) -> Option<usize> {
        self.consults += 1;
        *self.visits.entry(window.clone()).or_insert(0) += 1;

        if moves.is_empty() {
            if let Some(prev) = previous {
                self.learn(prev, self.params.reward_at_death, 0.0, rng);
            }
            return None;
        }

        let init = self.params.initial_value;
        let mut best = 0;
        let mut best_value = f32::NEG_INFINITY;
        for (i, &m) in moves.iter().enumerate() {
            let decision = Decision::new(window.clone(), m);
            let value = *self.q.value_or_init(&decision, init, rng);
            if value > best_value {
                best = i;
                best_value = value;
            }
        }

        let chosen = if self.params.epsilon > 0.0 && rng.r#gen::<f32>() < self.params.epsilon {
            rng.gen_range(0..moves.len())
        } else {
            best
        };
        // Reward and transition follow the greedy move even when exploring.
        let reward = if moves[best].eats {
            self.params.reward_on_eat
        } else {
            self.params.reward_alive
        };

        if let Some(prev) = previous {
            self.learn(prev, reward, best_value, rng);
            let next = Decision::new(window.clone(), moves[best]);
            *self
                .transitions
                .entry(prev.clone())
                .or_default()
                .entry(next.clone())
                .or_insert(0) += 1;
            self.predecessors.entry(next).or_default().insert(prev.clone());
        }

        Some(chosen)
    }

    fn learn<R: Rng>(&mut self, decision: &Decision, reward: f32, next_max: f32, rng: &mut R) {
        let alpha = self.params.alpha;
        let gamma = self.params.gamma;
        let qsa = self.q.value_or_init(decision, self.params.initial_value, rng);
        let td_target = reward + gamma * next_max;
        *qsa += alpha * (td_target - *qsa);
        self.updates += 1;
    }

    pub fn visits(&self, window: &Window) -> u64 {
        self.visits.get(window).copied().unwrap_or(0)
    }

    pub fn visit_counts(&self) -> impl Iterator<Item = (&Window, u64)> + '_ {
        self.visits.iter().map(|(w, n)| (w, *n))
    }

    pub fn transition_count(&self, from: &Decision, to: &Decision) -> u64 {
        self.transitions
            .get(from)
            .and_then(|next| next.get(to))
            .copied()
            .unwrap_or(0)
    }

    /// Every recorded `(from, to, count)` triple.
    pub fn transition_counts(&self) -> impl Iterator<Item = (&Decision, &Decision, u64)> + '_ {
        self.transitions
            .iter()
            .flat_map(|(from, next)| next.iter().map(move |(to, n)| (from, to, *n)))
    }

    /// Decisions observed to lead directly into `decision`.
    pub fn predecessors(&self, decision: &Decision) -> impl Iterator<Item = &Decision> + '_ {
        self.predecessors.get(decision).into_iter().flat_map(|set| set.iter())
    }

    pub(crate) fn restore_visits(&mut self, window: Window, count: u64) {
        *self.visits.entry(window).or_insert(0) += count;
    }

    pub(crate) fn restore_transition(&mut self, from: Decision, to: Decision, count: u64) {
        *self
            .transitions
            .entry(from.clone())
            .or_default()
            .entry(to.clone())
            .or_insert(0) += count;
        self.predecessors.entry(to).or_default().insert(from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, Grid};
    use crate::pos::Pos;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn params() -> LearningConfig {
        LearningConfig {
            alpha: 0.5,
            gamma: 0.9,
            reward_at_death: -10.0,
            reward_on_eat: 10.0,
            reward_alive: 0.5,
            initial_value: InitValue::Zero,
            epsilon: 0.0,
        }
    }

    fn window(cell: Cell) -> Window {
        let mut cells = vec![Cell::Empty; 9];
        cells[4] = Cell::Head;
        cells[0] = cell;
        Window::from_cells(1, cells)
    }

    const EAST: RelativeMove = RelativeMove { dx: 0, dy: 1, eats: false };
    const WEST: RelativeMove = RelativeMove { dx: 0, dy: -1, eats: false };
    const SOUTH_EAT: RelativeMove = RelativeMove { dx: 1, dy: 0, eats: true };

    #[test]
    fn first_consult_initializes_but_does_not_update() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut oracle = Oracle::new(params()).unwrap();
        let w = window(Cell::Empty);
        let seen = Decision::new(w.clone(), EAST);
        oracle.table_mut().insert(seen.clone(), 3.0);

        let pick = oracle.consult(&w, &[WEST, EAST], None, &mut rng);

        assert_eq!(pick, Some(1));
        assert_eq!(oracle.table().get(&seen), Some(3.0));
        assert_eq!(oracle.table().get(&Decision::new(w.clone(), WEST)), Some(0.0));
        assert_eq!(oracle.table().len(), 2);
        assert_eq!(oracle.updates(), 0);
        assert_eq!(oracle.visits(&w), 1);
        assert_eq!(oracle.transition_counts().count(), 0);
    }

    #[test]
    fn ties_go_to_the_first_move() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut oracle = Oracle::new(params()).unwrap();
        let w = window(Cell::Empty);
        assert_eq!(oracle.consult(&w, &[WEST, EAST, SOUTH_EAT], None, &mut rng), Some(0));
    }

    #[test]
    fn update_lags_one_step_behind() {
        let mut rng = SmallRng::seed_from_u64(0);
        let p = params();
        let mut oracle = Oracle::new(p.clone()).unwrap();
        let before = window(Cell::Empty);
        let after = window(Cell::Fruit);
        let prev = Decision::new(before.clone(), EAST);
        oracle.table_mut().insert(prev.clone(), 1.0);
        oracle.table_mut().insert(Decision::new(after.clone(), WEST), 0.25);
        oracle.table_mut().insert(Decision::new(after.clone(), SOUTH_EAT), 2.0);

        let pick = oracle.consult(&after, &[WEST, SOUTH_EAT], Some(&prev), &mut rng);
        assert_eq!(pick, Some(1));

        let expected = 1.0 + p.alpha * (p.reward_on_eat + p.gamma * 2.0 - 1.0);
        assert_eq!(oracle.table().get(&prev), Some(expected));
        // The current pair is untouched until the next consult.
        assert_eq!(oracle.table().get(&Decision::new(after.clone(), SOUTH_EAT)), Some(2.0));
        assert_eq!(oracle.updates(), 1);

        let next = Decision::new(after, SOUTH_EAT);
        assert_eq!(oracle.transition_count(&prev, &next), 1);
        assert_eq!(oracle.predecessors(&next).collect::<Vec<_>>(), vec![&prev]);
    }

    #[test]
    fn alive_reward_when_best_move_does_not_eat() {
        let mut rng = SmallRng::seed_from_u64(0);
        let p = params();
        let mut oracle = Oracle::new(p.clone()).unwrap();
        let w = window(Cell::Empty);
        let prev = Decision::new(w.clone(), WEST);
        oracle.table_mut().insert(prev.clone(), 0.0);
        oracle.table_mut().insert(Decision::new(w.clone(), EAST), 4.0);

        oracle.consult(&w, &[EAST], Some(&prev), &mut rng);
        let expected = 0.0 + p.alpha * (p.reward_alive + p.gamma * 4.0 - 0.0);
        assert_eq!(oracle.table().get(&prev), Some(expected));
    }

    #[test]
    fn no_moves_means_death_penalty() {
        let mut rng = SmallRng::seed_from_u64(0);
        let p = params();
        let mut oracle = Oracle::new(p.clone()).unwrap();
        let w = window(Cell::Wall);
        let prev = Decision::new(window(Cell::Empty), EAST);
        oracle.table_mut().insert(prev.clone(), 2.0);

        assert_eq!(oracle.consult(&w, &[], Some(&prev), &mut rng), None);
        let expected = 2.0 + p.alpha * (p.reward_at_death - 2.0);
        assert_eq!(oracle.table().get(&prev), Some(expected));
        assert_eq!(oracle.visits(&w), 1);
        assert_eq!(oracle.transition_counts().count(), 0);
    }

    #[test]
    fn uniform_prior_stays_in_range_and_is_stable() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut p = params();
        p.initial_value = InitValue::Uniform { low: -0.5, high: 0.5 };
        let mut oracle = Oracle::new(p).unwrap();
        let grid = Grid::new(5);
        let w = grid.window(Pos::new(3, 3), 1);

        oracle.consult(&w, &[EAST, WEST], None, &mut rng);
        let first: Vec<f32> = [EAST, WEST]
            .iter()
            .map(|m| oracle.table().get(&Decision::new(w.clone(), *m)).unwrap())
            .collect();
        assert!(first.iter().all(|v| (-0.5..=0.5).contains(v)));

        oracle.consult(&w, &[EAST, WEST], None, &mut rng);
        let second: Vec<f32> = [EAST, WEST]
            .iter()
            .map(|m| oracle.table().get(&Decision::new(w.clone(), *m)).unwrap())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn full_exploration_still_returns_legal_index() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut p = params();
        p.epsilon = 1.0;
        let mut oracle = Oracle::new(p).unwrap();
        let w = window(Cell::Empty);
        for _ in 0..20 {
            let pick = oracle.consult(&w, &[EAST, WEST, SOUTH_EAT], None, &mut rng);
            assert!(pick.is_some_and(|i| i < 3));
        }
    }

    #[test]
    fn exploration_grades_the_greedy_move() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut p = params();
        p.epsilon = 1.0;
        let mut oracle = Oracle::new(p.clone()).unwrap();
        let before = window(Cell::Empty);
        let after = window(Cell::Fruit);
        let prev = Decision::new(before, EAST);
        oracle.table_mut().insert(prev.clone(), 0.0);
        oracle.table_mut().insert(Decision::new(after.clone(), WEST), 0.0);
        oracle.table_mut().insert(Decision::new(after.clone(), SOUTH_EAT), 5.0);

        oracle.consult(&after, &[WEST, SOUTH_EAT], Some(&prev), &mut rng);

        let expected = p.alpha * (p.reward_on_eat + p.gamma * 5.0);
        assert_eq!(oracle.table().get(&prev), Some(expected));
        let greedy = Decision::new(after.clone(), SOUTH_EAT);
        assert_eq!(oracle.transition_count(&prev, &greedy), 1);
        assert_eq!(oracle.transition_count(&prev, &Decision::new(after, WEST)), 0);
    }

    #[test]
    fn rejects_inverted_prior() {
        let mut p = params();
        p.initial_value = InitValue::Uniform { low: 1.0, high: -1.0 };
        assert!(Oracle::new(p).is_err());
    }
}
