// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! # Tree Policies
//!
//! How a Monte-Carlo search walks down the explored part of the tree. The
//! default is UCB1, which balances a child's observed mean reward against
//! how rarely it has been tried.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use traverse_model::McStats;

/// Picks the child to descend into during the selection phase.
pub trait TreePolicy {
    /// The index into `children` to descend into. `parent_visits` is the
    /// visit count of the node being left. `children` is never empty.
    fn select(&mut self, parent_visits: u64, children: &[McStats]) -> usize;
}

/// UCB1 selection: `mean +/- sqrt(2 ln(parent) / child)`.
///
/// Unvisited children take priority over any visited one.
#[derive(Debug, Clone)]
pub struct UcbPolicy {
    maximize: bool,
}

impl UcbPolicy {
    /// UCB1 for reward-maximizing searches.
    pub fn maximizing() -> Self {
        UcbPolicy { maximize: true }
    }

    /// UCB1 for cost-minimizing searches.
    pub fn minimizing() -> Self {
        UcbPolicy { maximize: false }
    }

    fn bound(&self, parent_visits: u64, child: &McStats) -> f64 {
        let exploration = (2.0 * (parent_visits.max(1) as f64).ln() / child.visits as f64).sqrt();
        if self.maximize {
            child.mean() + exploration
        } else {
            child.mean() - exploration
        }
    }
}

impl TreePolicy for UcbPolicy {
    fn select(&mut self, parent_visits: u64, children: &[McStats]) -> usize {
        if let Some(unvisited) = children.iter().position(|child| child.visits == 0) {
            return unvisited;
        }
        let mut best = 0;
        let mut best_bound = self.bound(parent_visits, &children[0]);
        for (index, child) in children.iter().enumerate().skip(1) {
            let bound = self.bound(parent_visits, child);
            let better = if self.maximize {
                bound > best_bound
            } else {
                bound < best_bound
            };
            if better {
                best = index;
                best_bound = bound;
            }
        }
        best
    }
}

/// Uniformly random selection, mostly useful as a baseline.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    /// A random policy with a fixed seed, so runs are reproducible.
    pub fn seeded(seed: u64) -> Self {
        RandomPolicy {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl TreePolicy for RandomPolicy {
    fn select(&mut self, _parent_visits: u64, children: &[McStats]) -> usize {
        self.rng.gen_range(0..children.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(visits: u64, total_reward: f64) -> McStats {
        McStats {
            visits,
            total_reward,
        }
    }

    #[test]
    fn test_unvisited_children_take_priority() {
        let mut policy = UcbPolicy::maximizing();
        let children = [stats(10, 100.0), stats(0, 0.0), stats(5, 50.0)];
        assert_eq!(policy.select(15, &children), 1);
    }

    #[test]
    fn test_maximizing_prefers_higher_means() {
        let mut policy = UcbPolicy::maximizing();
        // Equal visit counts, so the exploration terms cancel out.
        let children = [stats(10, 10.0), stats(10, 90.0)];
        assert_eq!(policy.select(20, &children), 1);
    }

    #[test]
    fn test_minimizing_prefers_lower_means() {
        let mut policy = UcbPolicy::minimizing();
        let children = [stats(10, 10.0), stats(10, 90.0)];
        assert_eq!(policy.select(20, &children), 0);
    }

    #[test]
    fn test_rarely_tried_children_get_a_bonus() {
        let mut policy = UcbPolicy::maximizing();
        // Slightly worse mean but far fewer visits.
        let children = [stats(1000, 500.0), stats(2, 0.9)];
        assert_eq!(policy.select(1002, &children), 1);
    }

    #[test]
    fn test_random_policy_is_reproducible() {
        let children = [stats(1, 0.0); 8];
        let picks_a: Vec<usize> = {
            let mut policy = RandomPolicy::seeded(42);
            (0..16).map(|_| policy.select(8, &children)).collect()
        };
        let picks_b: Vec<usize> = {
            let mut policy = RandomPolicy::seeded(42);
            (0..16).map(|_| policy.select(8, &children)).collect()
        };
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().any(|pick| *pick > 0));
    }
}
