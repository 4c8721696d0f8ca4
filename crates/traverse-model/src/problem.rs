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

//! # Search Problems
//!
//! Bundles the graph-generator contracts into one value the strategies take
//! ownership of. Built through [`SearchProblemBuilder`], which makes the
//! mandatory parts (roots, successors, goal) impossible to forget and the
//! evaluator an explicit opt-in.

use crate::generator::{GoalTest, PathEvaluator, RootGenerator, SuccessorGenerator};
use crate::path::SearchPath;
use traverse_core::{AlgorithmError, CancellationToken};

/// A fully described search problem.
pub struct SearchProblem<S, A> {
    roots: Box<dyn RootGenerator<S> + Send + Sync>,
    successors: Box<dyn SuccessorGenerator<S, A> + Send + Sync>,
    goal: GoalTest<S, A>,
    evaluator: Option<Box<dyn PathEvaluator<S, A> + Send + Sync>>,
}

impl<S, A> SearchProblem<S, A> {
    /// The root states.
    #[inline]
    pub fn roots(&self) -> Vec<S> {
        self.roots.roots()
    }

    /// Expands `state` into its labelled successors.
    #[inline]
    pub fn successors(
        &self,
        state: &S,
        token: &CancellationToken,
    ) -> Result<Vec<(A, S)>, AlgorithmError> {
        self.successors.successors(state, token)
    }

    /// Applies the goal test to `path`.
    #[inline]
    pub fn is_goal(&self, path: &SearchPath<S, A>) -> bool {
        self.goal.matches(path)
    }

    /// `true` when the goal test looks at the head state only.
    #[inline]
    pub fn goal_over_nodes(&self) -> bool {
        matches!(self.goal, GoalTest::Node(_))
    }

    /// The path evaluator, if the problem carries one.
    #[inline]
    pub fn evaluator(&self) -> Option<&(dyn PathEvaluator<S, A> + Send + Sync)> {
        self.evaluator.as_deref()
    }

    /// Scores `path` with the problem's evaluator.
    ///
    /// Problems without an evaluator score every path `0.0`, which turns
    /// score-ordered strategies into plain exploration order.
    pub fn evaluate(&self, path: &SearchPath<S, A>) -> Result<f64, AlgorithmError> {
        match &self.evaluator {
            Some(evaluator) => evaluator.evaluate(path),
            None => Ok(0.0),
        }
    }
}

impl<S, A> std::fmt::Debug for SearchProblem<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchProblem")
            .field("goal", &self.goal)
            .field("has_evaluator", &self.evaluator.is_some())
            .finish()
    }
}

/// Builder for [`SearchProblem`].
pub struct SearchProblemBuilder<S, A> {
    roots: Box<dyn RootGenerator<S> + Send + Sync>,
    successors: Box<dyn SuccessorGenerator<S, A> + Send + Sync>,
    goal: GoalTest<S, A>,
    evaluator: Option<Box<dyn PathEvaluator<S, A> + Send + Sync>>,
}

impl<S, A> SearchProblemBuilder<S, A> {
    /// Starts a builder from the three mandatory contracts.
    pub fn new(
        roots: impl RootGenerator<S> + Send + Sync + 'static,
        successors: impl SuccessorGenerator<S, A> + Send + Sync + 'static,
        goal: GoalTest<S, A>,
    ) -> Self {
        SearchProblemBuilder {
            roots: Box::new(roots),
            successors: Box::new(successors),
            goal,
            evaluator: None,
        }
    }

    /// Attaches a path evaluator.
    pub fn evaluator(mut self, evaluator: impl PathEvaluator<S, A> + Send + Sync + 'static) -> Self {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    /// Finishes the problem.
    pub fn build(self) -> SearchProblem<S, A> {
        SearchProblem {
            roots: self.roots,
            successors: self.successors,
            goal: self.goal,
            evaluator: self.evaluator,
        }
    }
}
