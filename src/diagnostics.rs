//! Read-only views over what the Oracle has learned.

use crate::oracle::{Decision, Oracle, QTable};
use ahash::AHashMap;
use rayon::prelude::*;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QSummary {
    pub entries: usize,
    pub eating_entries: usize,
    /// Mean value over entries whose move eats a fruit.
    pub mean_eating: Option<f64>,
    pub mean_not_eating: Option<f64>,
    pub mean_all: Option<f64>,
}

#[derive(Clone, Copy, Default)]
struct Sums {
    eat_n: usize,
    eat_sum: f64,
    other_n: usize,
    other_sum: f64,
}

impl Sums {
    fn merge(self, other: Sums) -> Sums {
        Sums {
            eat_n: self.eat_n + other.eat_n,
            eat_sum: self.eat_sum + other.eat_sum,
            other_n: self.other_n + other.other_n,
            other_sum: self.other_sum + other.other_sum,
        }
    }
}

fn mean(sum: f64, n: usize) -> Option<f64> {
    (n > 0).then(|| sum / n as f64)
}

/// Averages table values split by whether the move eats.
pub fn summarize(table: &QTable) -> QSummary {
    let sums = table
        .map()
        .par_iter()
        .map(|(decision, &value)| {
            if decision.relative_move.eats {
                Sums { eat_n: 1, eat_sum: value as f64, ..Sums::default() }
            } else {
                Sums { other_n: 1, other_sum: value as f64, ..Sums::default() }
            }
        })
        .reduce(Sums::default, Sums::merge);

    QSummary {
        entries: sums.eat_n + sums.other_n,
        eating_entries: sums.eat_n,
        mean_eating: mean(sums.eat_sum, sums.eat_n),
        mean_not_eating: mean(sums.other_sum, sums.other_n),
        mean_all: mean(sums.eat_sum + sums.other_sum, sums.eat_n + sums.other_n),
    }
}

/// Steps from each decision to the nearest fruit-eating decision, following
/// observed transitions backwards. Eating decisions sit at distance 0;
/// decisions never seen leading towards food are absent.
pub fn distances_to_reward(oracle: &Oracle) -> AHashMap<Decision, usize> {
    let mut dist: AHashMap<Decision, usize> = AHashMap::new();
    let mut queue: VecDeque<&Decision> = VecDeque::new();

    let seeds = oracle
        .table()
        .iter()
        .map(|(d, _)| d)
        .chain(oracle.transition_counts().flat_map(|(from, to, _)| [from, to]))
        .filter(|d| d.relative_move.eats);
    for d in seeds {
        if !dist.contains_key(d) {
            dist.insert(d.clone(), 0);
            queue.push_back(d);
        }
    }

    while let Some(current) = queue.pop_front() {
        let next = dist.get(current).copied().unwrap_or(0) + 1;
        for prev in oracle.predecessors(current) {
            if !dist.contains_key(prev) {
                dist.insert(prev.clone(), next);
                queue.push_back(prev);
            }
        }
    }
    dist
}
