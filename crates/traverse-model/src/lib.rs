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

//! # Traverse Model
//!
//! The problem-side vocabulary of the engine: how a search space is
//! described (roots, successors, goals, evaluators), what a solution path
//! looks like, and how explored nodes are stored.
//!
//! ## Modules
//!
//! - [`generator`]: the graph-generator contracts a problem implements.
//! - [`problem`]: bundling the contracts into one [`problem::SearchProblem`].
//! - [`path`]: root-to-node paths, the currency of solutions.
//! - [`node`]: explored nodes and their strategy-specific labels.
//! - [`arena`]: index-based node storage with slot recycling.

pub mod arena;
pub mod generator;
pub mod node;
pub mod path;
pub mod problem;

pub use arena::{NodeArena, NodeId};
pub use generator::{GoalTest, PathEvaluator, RootGenerator, SuccessorGenerator};
pub use node::{McStats, Node, NodeLabel};
pub use path::SearchPath;
pub use problem::{SearchProblem, SearchProblemBuilder};
