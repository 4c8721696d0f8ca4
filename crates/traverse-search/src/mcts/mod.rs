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

//! # Monte-Carlo Tree Search
//!
//! ## Motivation
//!
//! When the space is too large to exhaust and the evaluator only scores
//! complete paths, sampling beats systematic expansion. Each step runs one
//! playout: walk the explored tree under a [`TreePolicy`], expand one new
//! node, roll out randomly to a terminal, score the resulting path and
//! propagate the reward back up. Branches proven hopeless (dead ends,
//! fully explored subtrees) are excluded from selection, and identical
//! playout paths are scored once through a cache.
//!
//! The search finishes once every branch below the roots is exhausted;
//! until then it is an anytime strategy that gets better the longer it is
//! allowed to sample.

pub mod policy;

pub use policy::{RandomPolicy, TreePolicy, UcbPolicy};

use crate::algorithm::{
    AlgorithmCore, AlgorithmState, CancelHandle, ResumableAlgorithm, SearchStatistics,
};
use crate::event::AlgorithmEvent;
use crate::listener::EventSink;
use fixedbitset::FixedBitSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use traverse_core::{AlgorithmError, Scheduler};
use traverse_model::{McStats, Node, NodeArena, NodeId, NodeLabel, SearchPath, SearchProblem};

/// Reward recorded for a playout whose path could not be scored or ran
/// into a dead end.
pub const DEFAULT_PENALTY: f64 = -1.0e9;

/// Rollouts stop after this many random steps if nothing terminal is hit.
pub const DEFAULT_ROLLOUT_DEPTH: usize = 256;

/// One-playout-per-step Monte-Carlo tree search.
pub struct MonteCarloTreeSearch<S, A> {
    core: AlgorithmCore<S, A>,
    problem: SearchProblem<S, A>,
    arena: NodeArena<S, A>,
    roots: Vec<NodeId>,
    root_stats: McStats,
    policy: Box<dyn TreePolicy + Send>,
    rollout_rng: StdRng,
    /// Scores of already seen playout paths, keyed by their state sequence.
    score_cache: FxHashMap<Vec<S>, f64>,
    /// Nodes known to have no successors.
    dead: FixedBitSet,
    /// Nodes whose whole subtree has been exhausted.
    fully_explored: FixedBitSet,
    penalty: f64,
    max_rollout_depth: usize,
}

impl<S, A> MonteCarloTreeSearch<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone,
{
    /// A reward-maximizing UCT search over `problem`.
    pub fn new(problem: SearchProblem<S, A>, scheduler: Arc<Scheduler>) -> Self {
        MonteCarloTreeSearch {
            core: AlgorithmCore::new(scheduler),
            problem,
            arena: NodeArena::new(),
            roots: Vec::new(),
            root_stats: McStats::default(),
            policy: Box::new(UcbPolicy::maximizing()),
            rollout_rng: StdRng::from_entropy(),
            score_cache: FxHashMap::default(),
            dead: FixedBitSet::new(),
            fully_explored: FixedBitSet::new(),
            penalty: DEFAULT_PENALTY,
            max_rollout_depth: DEFAULT_ROLLOUT_DEPTH,
        }
    }

    /// Replaces the tree policy.
    pub fn with_policy(mut self, policy: impl TreePolicy + Send + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Fixes the rollout seed, making runs reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rollout_rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Replaces the reward recorded for unscorable or dead-end playouts.
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }

    /// Caps the random rollout length.
    pub fn with_rollout_depth(mut self, depth: usize) -> Self {
        self.max_rollout_depth = depth;
        self
    }

    /// Sets the overall run budget.
    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.core.set_timeout(budget);
        self
    }

    /// Registers an event listener.
    pub fn register_listener(&mut self, sink: impl EventSink<S, A> + Send + 'static) {
        self.core.register_listener(sink);
    }

    /// Visit statistics of the whole search.
    #[inline]
    pub fn root_statistics(&self) -> McStats {
        self.root_stats
    }

    /// The explored part of the search space.
    #[inline]
    pub fn arena(&self) -> &NodeArena<S, A> {
        &self.arena
    }

    fn stats_of(&self, id: NodeId) -> McStats {
        match &self.arena[id].label {
            NodeLabel::McStats(stats) => *stats,
            _ => McStats::default(),
        }
    }

    fn grow_bitsets(&mut self) {
        let cap = self.arena.capacity_used();
        if self.dead.len() < cap {
            self.dead.grow(cap);
            self.fully_explored.grow(cap);
        }
    }

    fn is_excluded(&self, id: NodeId) -> bool {
        self.dead.contains(id.index()) || self.fully_explored.contains(id.index())
    }

    fn seed_roots(&mut self) -> Result<AlgorithmEvent<S, A>, AlgorithmError> {
        // Rollouts test arbitrary sampled states, which only a node-based
        // goal test can decide.
        if !self.problem.goal_over_nodes() {
            return Err(AlgorithmError::illegal_state(
                "Monte-Carlo search needs a node-based goal test",
            ));
        }
        for root in self.problem.roots() {
            let id = self
                .arena
                .insert(Node::root(root).with_label(NodeLabel::McStats(McStats::default())));
            self.roots.push(id);
        }
        self.grow_bitsets();
        Ok(AlgorithmEvent::Initialized)
    }

    fn backpropagate(&mut self, trail: &[NodeId], reward: f64) {
        self.root_stats.record(reward);
        for id in trail {
            if let Some(stats) = self.arena[*id].label.mc_stats_mut() {
                stats.record(reward);
            }
        }
    }

    /// Re-derives the exhaustion marks along the trail, leaf to root.
    fn propagate_exclusions(&mut self, trail: &[NodeId]) {
        for id in trail.iter().rev() {
            if self.is_excluded(*id) || !self.arena[*id].expanded {
                continue;
            }
            let exhausted = self.arena[*id]
                .children
                .iter()
                .all(|child| self.is_excluded(*child));
            if exhausted {
                self.fully_explored.insert(id.index());
            }
        }
    }

    /// Walks the explored tree under the policy until an unexpanded or
    /// terminal node is reached. Returns the trail, root first.
    fn select(&mut self) -> Option<Vec<NodeId>> {
        let eligible: Vec<NodeId> = self
            .roots
            .iter()
            .copied()
            .filter(|id| !self.is_excluded(*id))
            .collect();
        if eligible.is_empty() {
            return None;
        }
        let mut current = if eligible.len() == 1 {
            eligible[0]
        } else {
            let stats: Vec<McStats> = eligible.iter().map(|id| self.stats_of(*id)).collect();
            eligible[self.policy.select(self.root_stats.visits, &stats)]
        };
        let mut trail = vec![current];
        while self.arena[current].expanded {
            let eligible: Vec<NodeId> = self.arena[current]
                .children
                .iter()
                .copied()
                .filter(|child| !self.is_excluded(*child))
                .collect();
            if eligible.is_empty() {
                // Everything below is exhausted; the caller re-derives the
                // marks and tries again next step.
                self.fully_explored.insert(current.index());
                break;
            }
            let stats: Vec<McStats> = eligible.iter().map(|id| self.stats_of(*id)).collect();
            let pick = self.policy.select(self.stats_of(current).visits, &stats);
            current = eligible[pick];
            trail.push(current);
        }
        Some(trail)
    }

    /// Expands `id`, caching its children. Returns `false` if the node
    /// turned out to be a dead end.
    fn expand(&mut self, id: NodeId) -> Result<bool, AlgorithmError> {
        let state = self.arena[id].state.clone();
        let token = self.core.token().clone();
        let generated = self
            .core
            .compute_timeout_aware("successor generation", || {
                self.problem.successors(&state, &token)
            });
        let children = match generated {
            Ok(children) => children,
            Err(err) if err.is_recoverable() => {
                self.core.note_evaluation_failure(&err);
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        self.arena[id].expanded = true;
        self.core.note_expansion();
        if children.is_empty() {
            self.dead.insert(id.index());
            return Ok(false);
        }
        for (action, child_state) in children {
            let child = self.arena.insert(
                Node::child(child_state, id, action.clone())
                    .with_label(NodeLabel::McStats(McStats::default())),
            );
            self.arena.link_child(id, child);
            self.grow_bitsets();
            self.core.emit(AlgorithmEvent::NodeExpanded {
                parent: id,
                child,
                action,
            });
        }
        Ok(true)
    }

    /// Random walk from the end of `path` until a terminal or the depth
    /// cap. Returns the completed path and whether it ended in a goal.
    fn rollout(
        &mut self,
        mut path: SearchPath<S, A>,
    ) -> Result<(SearchPath<S, A>, bool), AlgorithmError> {
        let token = self.core.token().clone();
        for _ in 0..self.max_rollout_depth {
            self.core.check_termination()?;
            if self.problem.is_goal(&path) {
                return Ok((path, true));
            }
            let mut children = match self.problem.successors(path.head(), &token) {
                Ok(children) => children,
                Err(err) if err.is_recoverable() => {
                    self.core.note_evaluation_failure(&err);
                    Vec::new()
                }
                Err(err) => return Err(err),
            };
            if children.is_empty() {
                return Ok((path, false));
            }
            let pick = self.rollout_rng.gen_range(0..children.len());
            let (action, state) = children.swap_remove(pick);
            path = path.extended(action, state);
        }
        let reached_goal = self.problem.is_goal(&path);
        Ok((path, reached_goal))
    }

    /// Scores a completed playout path, going through the cache. Returns
    /// the reward and whether the path was seen for the first time.
    fn score_playout(
        &mut self,
        path: &SearchPath<S, A>,
        is_goal: bool,
    ) -> Result<(f64, bool), AlgorithmError> {
        let key: Vec<S> = path.states().to_vec();
        if let Some(&cached) = self.score_cache.get(&key) {
            return Ok((cached, false));
        }
        let reward = if !is_goal {
            self.penalty
        } else {
            match self.problem.evaluate(path) {
                Ok(score) => score,
                Err(err) if err.is_recoverable() => {
                    self.core.note_evaluation_failure(&err);
                    self.penalty
                }
                Err(err) => return Err(err),
            }
        };
        self.score_cache.insert(key, reward);
        Ok((reward, true))
    }

    fn playout(&mut self) -> Result<AlgorithmEvent<S, A>, AlgorithmError> {
        let Some(mut trail) = self.select() else {
            return Ok(AlgorithmEvent::Finished);
        };
        let leaf = *trail.last().expect("selection trail is never empty");

        // Terminal-at-tree cases first.
        let leaf_path = self.arena.path_to(leaf);
        if self.problem.is_goal(&leaf_path) {
            let (reward, first_seen) = self.score_playout(&leaf_path, true)?;
            self.fully_explored.insert(leaf.index());
            self.backpropagate(&trail, reward);
            self.propagate_exclusions(&trail);
            if first_seen {
                self.core.note_solution();
                let mut path = leaf_path;
                path.set_score(reward);
                return Ok(AlgorithmEvent::SolutionFound(path));
            }
            return Ok(AlgorithmEvent::Custom {
                name: "playout",
                payload: format!("revisited goal, reward {reward}"),
            });
        }

        if self.arena[leaf].expanded {
            // Selection dead-ended below an exhausted interior node.
            self.propagate_exclusions(&trail);
            return Ok(AlgorithmEvent::Custom {
                name: "probe",
                payload: leaf.to_string(),
            });
        }

        if !self.expand(leaf)? {
            self.backpropagate(&trail, self.penalty);
            self.propagate_exclusions(&trail);
            return Ok(AlgorithmEvent::Custom {
                name: "dead_end",
                payload: leaf.to_string(),
            });
        }

        // Roll out from the first fresh child, keeping the generation
        // order the policy also honors for untried nodes.
        let start = self.arena[leaf].children[0];
        trail.push(start);
        let (path, is_goal) = self.rollout(self.arena.path_to(start))?;
        let tree_depth = self.arena.path_to(start).len();
        let (reward, first_seen) = self.score_playout(&path, is_goal)?;
        if is_goal && path.len() == tree_depth {
            // The fresh child itself is a goal; nothing below it to sample.
            self.fully_explored.insert(start.index());
        }
        self.backpropagate(&trail, reward);
        self.propagate_exclusions(&trail);

        if is_goal && first_seen {
            self.core.note_solution();
            let mut path = path;
            path.set_score(reward);
            return Ok(AlgorithmEvent::SolutionFound(path));
        }
        Ok(AlgorithmEvent::Custom {
            name: "playout",
            payload: format!("reward {reward}"),
        })
    }
}

impl<S, A> ResumableAlgorithm<S, A> for MonteCarloTreeSearch<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone,
{
    fn state(&self) -> AlgorithmState {
        self.core.state()
    }

    fn step(&mut self) -> Result<AlgorithmEvent<S, A>, AlgorithmError> {
        let first_step = self.core.is_created();
        self.core.begin_step()?;
        let result = if first_step {
            self.seed_roots()
        } else {
            self.playout()
        };
        match result {
            Ok(event) => {
                self.core.complete_step(&event);
                Ok(event)
            }
            Err(err) => {
                let err = self.core.classify(err);
                self.core.fail(&err);
                Err(err)
            }
        }
    }

    fn cancel_handle(&self) -> CancelHandle {
        self.core.cancel_handle()
    }

    fn statistics(&self) -> &SearchStatistics {
        self.core.statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Termination;
    use traverse_core::CancellationToken;
    use traverse_model::{GoalTest, SearchProblemBuilder};

    /// Depth-3 binary tree over bit strings; goals are the leaves, rewarded
    /// by the number of ones.
    fn bitstring_problem() -> SearchProblem<Vec<u8>, u8> {
        SearchProblemBuilder::new(
            || vec![Vec::new()],
            |state: &Vec<u8>, _token: &CancellationToken| {
                if state.len() >= 3 {
                    return Ok(Vec::new());
                }
                let mut zero = state.clone();
                zero.push(0);
                let mut one = state.clone();
                one.push(1);
                Ok(vec![(0u8, zero), (1u8, one)])
            },
            GoalTest::over_nodes(|state: &Vec<u8>| state.len() == 3),
        )
        .evaluator(|path: &SearchPath<Vec<u8>, u8>| {
            Ok(path.head().iter().map(|bit| *bit as f64).sum())
        })
        .build()
    }

    #[test]
    fn test_exhausts_a_finite_tree() {
        let mut search = MonteCarloTreeSearch::new(bitstring_problem(), Arc::new(Scheduler::new()))
            .with_seed(7);
        let outcome = search.run_to_completion();

        assert_eq!(outcome.termination, Termination::Exhausted);
        // All eight leaves are found exactly once.
        assert_eq!(outcome.solutions.len(), 8);
        let mut heads: Vec<Vec<u8>> = outcome
            .solutions
            .iter()
            .map(|path| path.head().clone())
            .collect();
        heads.sort();
        heads.dedup();
        assert_eq!(heads.len(), 8);
    }

    #[test]
    fn test_rewards_accumulate_at_the_root() {
        let mut search = MonteCarloTreeSearch::new(bitstring_problem(), Arc::new(Scheduler::new()))
            .with_seed(11);
        search.step().unwrap();
        for _ in 0..4 {
            search.step().unwrap();
        }
        let stats = search.root_statistics();
        assert_eq!(stats.visits, 4);
        assert!(stats.mean() >= 0.0 && stats.mean() <= 3.0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = |seed: u64| {
            let mut search =
                MonteCarloTreeSearch::new(bitstring_problem(), Arc::new(Scheduler::new()))
                    .with_seed(seed);
            let outcome = search.run_to_completion();
            outcome
                .solutions
                .iter()
                .map(|path| path.head().clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
    }

    #[test]
    fn test_dead_ends_are_penalized_and_excluded() {
        // Branch 0 dead-ends without reaching a goal; branch 1 is a goal.
        let problem = SearchProblemBuilder::new(
            || vec![0u32],
            |state: &u32, _token: &CancellationToken| match state {
                0 => Ok(vec![(0u8, 1), (1u8, 2)]),
                _ => Ok(Vec::new()),
            },
            GoalTest::over_nodes(|state: &u32| *state == 2),
        )
        .evaluator(|_: &SearchPath<u32, u8>| Ok(1.0))
        .build();

        let mut search =
            MonteCarloTreeSearch::new(problem, Arc::new(Scheduler::new())).with_seed(5);
        let outcome = search.run_to_completion();
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(outcome.solutions.len(), 1);
        assert_eq!(*outcome.solutions[0].head(), 2);
    }

    #[test]
    fn test_unscorable_playouts_use_the_penalty() {
        let problem = SearchProblemBuilder::new(
            || vec![0u32],
            |state: &u32, _token: &CancellationToken| match state {
                0 => Ok(vec![(0u8, 1)]),
                _ => Ok(Vec::new()),
            },
            GoalTest::over_nodes(|state: &u32| *state == 1),
        )
        .evaluator(|_: &SearchPath<u32, u8>| {
            Err(AlgorithmError::EvaluationFailed("no score".to_string()))
        })
        .build();

        let mut search =
            MonteCarloTreeSearch::new(problem, Arc::new(Scheduler::new())).with_seed(5);
        let outcome = search.run_to_completion();
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert!(outcome.statistics.evaluation_failures >= 1);
        assert_eq!(search.root_statistics().total_reward, DEFAULT_PENALTY);
    }

    #[test]
    fn test_selection_converges_on_the_viable_action() {
        // A chain of length three; at every level action 1 stays on the
        // chain and action 0 falls off into a dead end.
        let problem = SearchProblemBuilder::new(
            || vec![0i32],
            |state: &i32, _token: &CancellationToken| {
                if (0..3).contains(state) {
                    Ok(vec![(0u8, -(state + 1)), (1u8, state + 1)])
                } else {
                    Ok(Vec::new())
                }
            },
            GoalTest::over_nodes(|state: &i32| *state == 3),
        )
        .evaluator(|_: &SearchPath<i32, u8>| Ok(1.0))
        .build();

        let mut search =
            MonteCarloTreeSearch::new(problem, Arc::new(Scheduler::new())).with_seed(9);
        let outcome = search.run_to_completion();
        assert_eq!(outcome.solutions.len(), 1);

        // The root's viable child soaked up the sampling; its dead sibling
        // was tried, penalized and excluded.
        let arena = search.arena();
        let root = arena.get(NodeId::new(0)).expect("root is live");
        let mut viable_visits = 0;
        let mut dead_visits = 0;
        for child in &root.children {
            let node = &arena[*child];
            let visits = match &node.label {
                NodeLabel::McStats(stats) => stats.visits,
                _ => 0,
            };
            if node.state >= 0 {
                viable_visits = visits;
            } else {
                dead_visits = visits;
            }
        }
        assert!(viable_visits > dead_visits);
    }

    #[test]
    fn test_path_goal_tests_are_rejected() {
        let problem = SearchProblemBuilder::new(
            || vec![0u32],
            |_: &u32, _: &CancellationToken| Ok(Vec::<(u8, u32)>::new()),
            GoalTest::over_paths(|path: &SearchPath<u32, u8>| path.len() > 2),
        )
        .build();
        let mut search = MonteCarloTreeSearch::new(problem, Arc::new(Scheduler::new()));
        assert!(matches!(
            search.step(),
            Err(AlgorithmError::IllegalState(_))
        ));
        assert_eq!(search.state(), AlgorithmState::Failed);
    }

    #[test]
    fn test_fresh_children_are_sampled_in_generation_order() {
        let mut search = MonteCarloTreeSearch::new(bitstring_problem(), Arc::new(Scheduler::new()))
            .with_seed(1);
        search.step().unwrap();
        search.step().unwrap();

        // The first playout expanded the root and rolled out from its
        // first-generated child; the sibling is still untouched.
        let arena = search.arena();
        let root = arena.get(NodeId::new(0)).expect("root is live");
        let visits: Vec<u64> = root
            .children
            .iter()
            .map(|child| match &arena[*child].label {
                NodeLabel::McStats(stats) => stats.visits,
                _ => 0,
            })
            .collect();
        assert_eq!(visits, vec![1, 0]);
    }

    #[test]
    fn test_cancellation_stops_sampling() {
        let mut search = MonteCarloTreeSearch::new(bitstring_problem(), Arc::new(Scheduler::new()))
            .with_seed(2);
        search.step().unwrap();
        search.cancel_handle().cancel();
        assert_eq!(search.step(), Err(AlgorithmError::Cancelled));
        assert_eq!(search.state(), AlgorithmState::Failed);
    }
}
