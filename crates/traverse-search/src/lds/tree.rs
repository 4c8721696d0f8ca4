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

//! # Discrepancy-Bounded Tree Probing
//!
//! ## Motivation
//!
//! When the successor generator emits children in a trusted preference
//! order, plain depth-first search over-commits to early mistakes. The
//! probe instead rations deviations: an iteration with bound `k` walks
//! every path whose deviation ranks sum to at most `k`, reports the goals
//! that need exactly `k`, and the bound widens by one once an iteration had
//! to prune. Solutions therefore arrive ordered by how far they stray from
//! the preferred path.
//!
//! Generated children are cached in the arena, so re-walking the shallow
//! part of the tree in later iterations costs no successor calls.

use crate::algorithm::{
    AlgorithmCore, AlgorithmState, CancelHandle, ResumableAlgorithm, SearchStatistics,
};
use crate::event::AlgorithmEvent;
use crate::listener::EventSink;
use std::sync::Arc;
use std::time::Duration;
use traverse_core::{AlgorithmError, Scheduler};
use traverse_model::{Node, NodeArena, NodeId, NodeLabel, SearchProblem};

/// Iteratively widened limited-discrepancy search.
pub struct LimitedDiscrepancySearch<S, A> {
    core: AlgorithmCore<S, A>,
    problem: SearchProblem<S, A>,
    arena: NodeArena<S, A>,
    roots: Vec<NodeId>,
    /// Depth-first probe stack of the running iteration.
    stack: Vec<NodeId>,
    max_discrepancies: u32,
    /// Whether the running iteration skipped a child over the bound.
    pruned: bool,
}

impl<S, A> LimitedDiscrepancySearch<S, A>
where
    S: Clone,
    A: Clone,
{
    /// A probe over `problem`, starting with a discrepancy bound of zero.
    pub fn new(problem: SearchProblem<S, A>, scheduler: Arc<Scheduler>) -> Self {
        LimitedDiscrepancySearch {
            core: AlgorithmCore::new(scheduler),
            problem,
            arena: NodeArena::new(),
            roots: Vec::new(),
            stack: Vec::new(),
            max_discrepancies: 0,
            pruned: false,
        }
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

    /// The discrepancy bound of the running iteration.
    #[inline]
    pub fn discrepancy_bound(&self) -> u32 {
        self.max_discrepancies
    }

    fn deviations_of(&self, id: NodeId) -> u32 {
        match &self.arena[id].label {
            NodeLabel::DiscrepancyPath(ranks) => ranks.iter().sum(),
            _ => 0,
        }
    }

    fn seed_roots(&mut self) -> Result<AlgorithmEvent<S, A>, AlgorithmError> {
        for root in self.problem.roots() {
            let id = self
                .arena
                .insert(Node::root(root).with_label(NodeLabel::DiscrepancyPath(Vec::new())));
            self.roots.push(id);
        }
        self.stack.extend(self.roots.iter().rev());
        Ok(AlgorithmEvent::Initialized)
    }

    /// Starts the next iteration with a widened bound.
    fn widen(&mut self) -> AlgorithmEvent<S, A> {
        self.max_discrepancies += 1;
        self.pruned = false;
        self.stack.extend(self.roots.iter().rev());
        tracing::debug!(bound = self.max_discrepancies, "widening discrepancy bound");
        AlgorithmEvent::NoMoreCandidates
    }

    /// Generates and caches the children of `id` on first visit.
    fn ensure_expanded(&mut self, id: NodeId) -> Result<Vec<AlgorithmEvent<S, A>>, AlgorithmError> {
        if self.arena[id].expanded {
            return Ok(Vec::new());
        }
        let state = self.arena[id].state.clone();
        let parent_ranks = match &self.arena[id].label {
            NodeLabel::DiscrepancyPath(ranks) => ranks.clone(),
            _ => Vec::new(),
        };
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

        let mut events = Vec::new();
        for (rank, (action, child_state)) in children.into_iter().enumerate() {
            let mut ranks = parent_ranks.clone();
            if rank > 0 {
                ranks.push(rank as u32);
            }
            let child = self.arena.insert(
                Node::child(child_state, id, action.clone())
                    .with_label(NodeLabel::DiscrepancyPath(ranks)),
            );
            self.arena.link_child(id, child);
            events.push(AlgorithmEvent::NodeExpanded {
                parent: id,
                child,
                action,
            });
        }
        Ok(events)
    }

    fn probe(&mut self) -> Result<AlgorithmEvent<S, A>, AlgorithmError> {
        let Some(id) = self.stack.pop() else {
            return Ok(if self.pruned {
                self.widen()
            } else {
                AlgorithmEvent::Finished
            });
        };

        let used = self.deviations_of(id);
        let path = self.arena.path_to(id);
        if self.problem.is_goal(&path) {
            // A goal needing fewer deviations was already reported by an
            // earlier iteration.
            if used == self.max_discrepancies {
                self.core.note_solution();
                return Ok(AlgorithmEvent::SolutionFound(path));
            }
            return Ok(AlgorithmEvent::Custom {
                name: "probe",
                payload: id.to_string(),
            });
        }

        let mut expansions = self.ensure_expanded(id)?;
        let children: Vec<NodeId> = self.arena[id].children.iter().copied().collect();
        for (rank, child) in children.into_iter().enumerate().rev() {
            if used + rank as u32 <= self.max_discrepancies {
                self.stack.push(child);
            } else {
                self.pruned = true;
            }
        }

        match expansions.pop() {
            Some(last) => {
                for event in expansions {
                    self.core.emit(event);
                }
                Ok(last)
            }
            None => Ok(AlgorithmEvent::Custom {
                name: "probe",
                payload: id.to_string(),
            }),
        }
    }
}

impl<S, A> ResumableAlgorithm<S, A> for LimitedDiscrepancySearch<S, A>
where
    S: Clone,
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
            self.probe()
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

    /// Full binary tree with leaves `3..=6`; left children are preferred.
    fn leaf_problem() -> SearchProblem<u32, char> {
        SearchProblemBuilder::new(
            || vec![0u32],
            |state: &u32, _token: &CancellationToken| {
                if *state < 3 {
                    Ok(vec![('l', state * 2 + 1), ('r', state * 2 + 2)])
                } else {
                    Ok(Vec::new())
                }
            },
            GoalTest::over_nodes(|state: &u32| *state >= 3),
        )
        .build()
    }

    #[test]
    fn test_solutions_arrive_in_deviation_order() {
        let mut search = LimitedDiscrepancySearch::new(leaf_problem(), Arc::new(Scheduler::new()));
        let outcome = search.run_to_completion();

        assert_eq!(outcome.termination, Termination::Exhausted);
        let found: Vec<u32> = outcome
            .solutions
            .iter()
            .map(|path| *path.head())
            .collect();
        // Leaf 3 strays zero times, 4 and 5 once, 6 twice.
        assert_eq!(found, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_iterations_are_separated_by_no_more_candidates() {
        let mut search = LimitedDiscrepancySearch::new(leaf_problem(), Arc::new(Scheduler::new()));
        let mut widenings = 0;
        loop {
            match search.step().unwrap() {
                AlgorithmEvent::NoMoreCandidates => widenings += 1,
                AlgorithmEvent::Finished => break,
                _ => {}
            }
        }
        // Bounds 0 and 1 both had to prune; bound 2 finished the tree.
        assert_eq!(widenings, 2);
        assert_eq!(search.discrepancy_bound(), 2);
    }

    #[test]
    fn test_cached_subtree_is_not_regenerated() {
        let mut search = LimitedDiscrepancySearch::new(leaf_problem(), Arc::new(Scheduler::new()));
        let outcome = search.run_to_completion();
        // Three interior nodes, expanded once each despite three iterations.
        assert_eq!(outcome.statistics.nodes_expanded, 3);
    }

    #[test]
    fn test_goalless_tree_just_finishes() {
        let problem = SearchProblemBuilder::new(
            || vec![0u32],
            |state: &u32, _token: &CancellationToken| {
                if *state < 1 {
                    Ok(vec![('l', 1), ('r', 2)])
                } else {
                    Ok(Vec::new())
                }
            },
            GoalTest::over_nodes(|_: &u32| false),
        )
        .build();
        let mut search = LimitedDiscrepancySearch::new(problem, Arc::new(Scheduler::new()));
        let outcome = search.run_to_completion();
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert!(outcome.solutions.is_empty());
    }

    #[test]
    fn test_cancellation_mid_iteration() {
        let mut search = LimitedDiscrepancySearch::new(leaf_problem(), Arc::new(Scheduler::new()));
        search.step().unwrap();
        search.cancel_handle().cancel();
        assert_eq!(search.step(), Err(AlgorithmError::Cancelled));
        assert_eq!(search.state(), AlgorithmState::Failed);
    }
}
