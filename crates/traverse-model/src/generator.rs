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

//! # Graph-Generator Contracts
//!
//! ## Motivation
//!
//! The engine never sees a materialized graph. A problem hands it three
//! things: where to start ([`RootGenerator`]), how to move
//! ([`SuccessorGenerator`]) and when to stop ([`GoalTest`]); optionally a
//! [`PathEvaluator`] that scores candidate paths. Everything the strategies
//! do is phrased against these contracts, so the same strategy runs on any
//! problem that implements them.
//!
//! Successor generation and evaluation take the execution context's
//! cancellation token and may be expensive; both report per-candidate
//! failures as [`AlgorithmError::EvaluationFailed`], which strategies treat
//! as "drop the candidate, keep searching".

use crate::path::SearchPath;
use traverse_core::{AlgorithmError, CancellationToken};

/// Produces the root states of the search space.
pub trait RootGenerator<S> {
    /// The roots, in the order the search should seed them.
    fn roots(&self) -> Vec<S>;
}

impl<S, F> RootGenerator<S> for F
where
    F: Fn() -> Vec<S>,
{
    fn roots(&self) -> Vec<S> {
        self()
    }
}

/// Expands a state into its labelled successors.
pub trait SuccessorGenerator<S, A> {
    /// The `(action, state)` successors of `state`, in preference order
    /// where the problem has one.
    ///
    /// Expensive generators should poll `token` at safe points and bail out
    /// with its error when it trips.
    fn successors(
        &self,
        state: &S,
        token: &CancellationToken,
    ) -> Result<Vec<(A, S)>, AlgorithmError>;
}

impl<S, A, F> SuccessorGenerator<S, A> for F
where
    F: Fn(&S, &CancellationToken) -> Result<Vec<(A, S)>, AlgorithmError>,
{
    fn successors(
        &self,
        state: &S,
        token: &CancellationToken,
    ) -> Result<Vec<(A, S)>, AlgorithmError> {
        self(state, token)
    }
}

/// Scores a root-to-node path. Lower is better unless the strategy says
/// otherwise.
pub trait PathEvaluator<S, A> {
    /// The score of `path`, or [`AlgorithmError::EvaluationFailed`] if this
    /// particular path cannot be scored.
    fn evaluate(&self, path: &SearchPath<S, A>) -> Result<f64, AlgorithmError>;
}

impl<S, A, F> PathEvaluator<S, A> for F
where
    F: Fn(&SearchPath<S, A>) -> Result<f64, AlgorithmError>,
{
    fn evaluate(&self, path: &SearchPath<S, A>) -> Result<f64, AlgorithmError> {
        self(path)
    }
}

/// Decides whether a reached candidate is a solution.
///
/// Whether the test looks at the head state alone or at the whole path is
/// fixed when the problem is built and never changes afterwards.
pub enum GoalTest<S, A> {
    /// The head state alone decides.
    Node(Box<dyn Fn(&S) -> bool + Send + Sync>),
    /// The whole root-to-node path decides.
    Path(Box<dyn Fn(&SearchPath<S, A>) -> bool + Send + Sync>),
}

impl<S, A> GoalTest<S, A> {
    /// A node-based goal test.
    pub fn over_nodes(test: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        GoalTest::Node(Box::new(test))
    }

    /// A path-based goal test.
    pub fn over_paths(test: impl Fn(&SearchPath<S, A>) -> bool + Send + Sync + 'static) -> Self {
        GoalTest::Path(Box::new(test))
    }

    /// Applies the test to `path`.
    #[inline]
    pub fn matches(&self, path: &SearchPath<S, A>) -> bool {
        match self {
            GoalTest::Node(test) => test(path.head()),
            GoalTest::Path(test) => test(path),
        }
    }
}

impl<S, A> std::fmt::Debug for GoalTest<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalTest::Node(_) => f.write_str("GoalTest::Node"),
            GoalTest::Path(_) => f.write_str("GoalTest::Path"),
        }
    }
}
