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

//! # Traverse Search
//!
//! Resumable, interruptible search strategies over generator-described
//! spaces. Every strategy is driven one event at a time, honors a shared
//! cancellation token and an overall deadline, and reports what it does
//! through a listener fan-out.
//!
//! ## Modules
//!
//! - [`algorithm`]: the lifecycle machinery shared by all strategies.
//! - [`event`] and [`listener`]: the observable record of a run.
//! - [`frontier`]: the score-ordered open list.
//! - [`best_first`]: score-ordered exhaustive search.
//! - [`lds`]: limited-discrepancy probing and relation enumeration.
//! - [`mcts`]: Monte-Carlo tree search with UCB1 selection.

pub mod algorithm;
pub mod best_first;
pub mod event;
pub mod frontier;
pub mod lds;
pub mod listener;
pub mod mcts;

pub use algorithm::{
    AlgorithmState, CancelHandle, ResumableAlgorithm, RunOutcome, SearchStatistics, Termination,
};
pub use best_first::BestFirstSearch;
pub use event::AlgorithmEvent;
pub use frontier::OpenList;
pub use lds::{CartesianEnumerator, LimitedDiscrepancySearch};
pub use listener::{ChannelSink, EventSink, ListenerSet, TracingSink};
pub use mcts::{MonteCarloTreeSearch, RandomPolicy, TreePolicy, UcbPolicy};
