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

//! # Best-First Search
//!
//! ## Motivation
//!
//! The workhorse strategy: always expand the open node with the best
//! evaluator score. Run as a resumable instance it enumerates solutions in
//! score order, one step at a time, and survives per-candidate evaluator
//! failures by dropping the candidate.
//!
//! ## Usage
//!
//! ```ignore
//! let mut search = BestFirstSearch::new(problem, scheduler)
//!     .with_timeout(Duration::from_secs(10));
//! let outcome = search.run_to_completion();
//! ```

use crate::algorithm::{
    AlgorithmCore, AlgorithmState, CancelHandle, ResumableAlgorithm, SearchStatistics,
};
use crate::event::AlgorithmEvent;
use crate::frontier::{OpenList, ScoreOrdering};
use crate::listener::EventSink;
use std::sync::Arc;
use std::time::Duration;
use traverse_core::{AlgorithmError, Scheduler};
use traverse_model::{Node, NodeArena, NodeLabel, SearchProblem};

/// Score-ordered exhaustive search.
pub struct BestFirstSearch<S, A> {
    core: AlgorithmCore<S, A>,
    problem: SearchProblem<S, A>,
    arena: NodeArena<S, A>,
    open: OpenList,
}

impl<S, A> BestFirstSearch<S, A>
where
    S: Clone,
    A: Clone,
{
    /// A minimizing best-first search over `problem`.
    pub fn new(problem: SearchProblem<S, A>, scheduler: Arc<Scheduler>) -> Self {
        BestFirstSearch {
            core: AlgorithmCore::new(scheduler),
            problem,
            arena: NodeArena::new(),
            open: OpenList::minimizing(),
        }
    }

    /// Replaces the score ordering, e.g. with [`OpenList::maximizing`]'s.
    pub fn with_score_ordering(mut self, ordering: ScoreOrdering) -> Self {
        debug_assert!(self.core.is_created());
        self.open = OpenList::with_ordering(ordering);
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

    /// The explored part of the search space.
    #[inline]
    pub fn arena(&self) -> &NodeArena<S, A> {
        &self.arena
    }

    fn seed_roots(&mut self) -> Result<AlgorithmEvent<S, A>, AlgorithmError> {
        for root in self.problem.roots() {
            let id = self.arena.insert(Node::root(root));
            match self.problem.evaluate(&self.arena.path_to(id)) {
                Ok(score) => {
                    self.arena[id].label = NodeLabel::Cost(score);
                    self.open.push(id, score);
                }
                Err(err) if err.is_recoverable() => {
                    self.core.note_evaluation_failure(&err);
                    self.arena.release(id);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(AlgorithmEvent::Initialized)
    }

    fn expand_next(&mut self) -> Result<AlgorithmEvent<S, A>, AlgorithmError> {
        let Some((id, score)) = self.open.pop() else {
            return Ok(AlgorithmEvent::Finished);
        };
        let path = self.arena.path_to(id);
        if self.problem.is_goal(&path) {
            self.core.note_solution();
            let mut path = path;
            path.set_score(score);
            return Ok(AlgorithmEvent::SolutionFound(path));
        }

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

        let mut expansions = Vec::new();
        for (action, child_state) in children {
            let child = self.arena.insert(Node::child(child_state, id, action.clone()));
            match self.problem.evaluate(&self.arena.path_to(child)) {
                Ok(child_score) => {
                    self.arena[child].label = NodeLabel::Cost(child_score);
                    self.arena.link_child(id, child);
                    self.open.push(child, child_score);
                    expansions.push(AlgorithmEvent::NodeExpanded {
                        parent: id,
                        child,
                        action,
                    });
                }
                Err(err) if err.is_recoverable() => {
                    self.core.note_evaluation_failure(&err);
                    self.arena.release(child);
                }
                Err(err) => return Err(err),
            }
        }

        // The last expansion is the step's event; the others reach the
        // listeners directly.
        match expansions.pop() {
            Some(last) => {
                for event in expansions {
                    self.core.emit(event);
                }
                Ok(last)
            }
            None => Ok(AlgorithmEvent::Custom {
                name: "dead_end",
                payload: id.to_string(),
            }),
        }
    }
}

impl<S, A> ResumableAlgorithm<S, A> for BestFirstSearch<S, A>
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
            self.expand_next()
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
    use crate::listener::ChannelSink;
    use traverse_core::CancellationToken;
    use traverse_model::{GoalTest, SearchPath, SearchProblemBuilder};

    /// Implicit binary tree over `u32`: children of `n` are `2n + 1` and
    /// `2n + 2`, capped at `limit`.
    fn binary_tree_problem(
        limit: u32,
        goal: impl Fn(&u32) -> bool + Send + Sync + 'static,
    ) -> SearchProblem<u32, char> {
        SearchProblemBuilder::new(
            || vec![0u32],
            move |state: &u32, _token: &CancellationToken| {
                let mut children = Vec::new();
                if state * 2 + 1 <= limit {
                    children.push(('l', state * 2 + 1));
                }
                if state * 2 + 2 <= limit {
                    children.push(('r', state * 2 + 2));
                }
                Ok(children)
            },
            GoalTest::over_nodes(goal),
        )
        .evaluator(|path: &SearchPath<u32, char>| Ok(*path.head() as f64))
        .build()
    }

    #[test]
    fn test_first_step_initializes() {
        let problem = binary_tree_problem(10, |_| false);
        let mut search = BestFirstSearch::new(problem, Arc::new(Scheduler::new()));
        assert_eq!(search.step().unwrap(), AlgorithmEvent::Initialized);
        assert_eq!(search.state(), AlgorithmState::Inactive);
    }

    #[test]
    fn test_solutions_arrive_in_score_order() {
        // Goals are the leaves 7..=10; scores equal the state value.
        let problem = binary_tree_problem(10, |state| *state >= 7);
        let mut search = BestFirstSearch::new(problem, Arc::new(Scheduler::new()));
        let outcome = search.run_to_completion();

        assert_eq!(outcome.termination, Termination::Exhausted);
        let found: Vec<u32> = outcome
            .solutions
            .iter()
            .map(|path| *path.head())
            .collect();
        assert_eq!(found, vec![7, 8, 9, 10]);
        assert_eq!(outcome.statistics.solutions_found, 4);
    }

    #[test]
    fn test_solution_paths_carry_their_score() {
        let problem = binary_tree_problem(6, |state| *state == 5);
        let mut search = BestFirstSearch::new(problem, Arc::new(Scheduler::new()));
        let outcome = search.run_to_completion();
        let solution = outcome.best_solution().unwrap();
        assert_eq!(solution.states(), &[0, 2, 5]);
        assert_eq!(solution.score(), Some(5.0));
    }

    #[test]
    fn test_failing_evaluation_drops_only_that_candidate() {
        let problem = SearchProblemBuilder::new(
            || vec![0u32],
            |state: &u32, _: &CancellationToken| {
                if *state == 0 {
                    Ok(vec![('l', 1), ('r', 2)])
                } else {
                    Ok(Vec::new())
                }
            },
            GoalTest::over_nodes(|state: &u32| *state == 2),
        )
        .evaluator(|path: &SearchPath<u32, char>| {
            if *path.head() == 1 {
                Err(AlgorithmError::EvaluationFailed("unscorable".to_string()))
            } else {
                Ok(*path.head() as f64)
            }
        })
        .build();

        let mut search = BestFirstSearch::new(problem, Arc::new(Scheduler::new()));
        let outcome = search.run_to_completion();
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(outcome.solutions.len(), 1);
        assert_eq!(outcome.statistics.evaluation_failures, 1);
    }

    #[test]
    fn test_listeners_observe_every_expansion() {
        let problem = binary_tree_problem(6, |_| false);
        let mut search = BestFirstSearch::new(problem, Arc::new(Scheduler::new()));
        let (sink, receiver) = ChannelSink::channel();
        search.register_listener(sink);
        search.run_to_completion();

        let expansions = receiver
            .try_iter()
            .filter(|event| matches!(event, AlgorithmEvent::NodeExpanded { .. }))
            .count();
        // Six children are generated below the root in total.
        assert_eq!(expansions, 6);
    }

    #[test]
    fn test_cancellation_stops_the_run() {
        let problem = binary_tree_problem(u32::MAX - 2, |_| false);
        let mut search = BestFirstSearch::new(problem, Arc::new(Scheduler::new()));
        search.step().unwrap();
        search.cancel_handle().cancel();
        assert_eq!(search.step(), Err(AlgorithmError::Cancelled));
        assert_eq!(search.state(), AlgorithmState::Failed);
    }

    /// One root whose successor call polls the token until it trips.
    fn blocking_generator_problem() -> SearchProblem<u32, char> {
        SearchProblemBuilder::new(
            || vec![0u32],
            |_: &u32, token: &CancellationToken| -> Result<Vec<(char, u32)>, AlgorithmError> {
                loop {
                    token.check()?;
                    std::thread::sleep(Duration::from_millis(1));
                }
            },
            GoalTest::over_nodes(|_: &u32| false),
        )
        .build()
    }

    #[test]
    fn test_deadline_tripping_the_generator_reports_timeout() {
        // With this little budget left the generator runs without a timer
        // of its own, so the run-budget interrupt is what trips the token
        // mid-call. That must still surface as a timeout, not as a cancel.
        let scheduler = Arc::new(Scheduler::new());
        let mut search = BestFirstSearch::new(blocking_generator_problem(), Arc::clone(&scheduler))
            .with_timeout(Duration::from_millis(120));
        let outcome = search.run_to_completion();
        assert!(matches!(
            outcome.termination,
            Termination::Failed(AlgorithmError::Timeout { .. })
        ));
        assert_eq!(scheduler.pending_tasks(), 0);
    }

    #[test]
    fn test_cancel_from_another_thread_unblocks_the_generator() {
        let mut search =
            BestFirstSearch::new(blocking_generator_problem(), Arc::new(Scheduler::new()));
        search.step().unwrap();

        let handle = search.cancel_handle();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            handle.cancel();
        });
        let blocked_at = std::time::Instant::now();
        assert_eq!(search.step(), Err(AlgorithmError::Cancelled));
        // The generator polls every millisecond, so the cancel lands fast.
        assert!(blocked_at.elapsed() < Duration::from_secs(2));
        assert_eq!(search.state(), AlgorithmState::Failed);
        canceller.join().unwrap();
    }

    #[test]
    fn test_run_budget_bounds_an_unbounded_space() {
        let problem = binary_tree_problem(u32::MAX - 2, |_| false);
        let scheduler = Arc::new(Scheduler::new());
        let mut search = BestFirstSearch::new(problem, Arc::clone(&scheduler))
            .with_timeout(Duration::from_millis(50));
        let outcome = search.run_to_completion();
        assert!(matches!(
            outcome.termination,
            Termination::Failed(AlgorithmError::Timeout { .. })
        ));
        assert_eq!(scheduler.pending_tasks(), 0);
    }
}
