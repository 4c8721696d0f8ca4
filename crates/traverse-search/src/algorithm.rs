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

//! # Algorithm Lifecycle
//!
//! ## Motivation
//!
//! Every strategy in this crate is resumable: callers pull one event at a
//! time via `step()` and may stop, inspect and resume between steps. The
//! bookkeeping that makes this safe (state transitions, the overall
//! deadline, termination checks, statistics, event fan-out) is identical
//! across strategies, so it lives in [`AlgorithmCore`] and the strategies
//! only provide the search semantics.
//!
//! ## Highlights
//!
//! - [`AlgorithmState`]: `Created -> Active <-> Inactive -> Terminated`,
//!   with `Failed` absorbing fatal errors from any live state.
//! - One event per successful `step()`; intra-step observations reach
//!   listeners only.
//! - [`AlgorithmCore::check_termination`] enforces the precedence external
//!   signal, then cancellation, then deadline.
//! - [`ResumableAlgorithm::run_to_completion`] drives `step()` in a loop
//!   and folds the run into a [`RunOutcome`].

use crate::event::AlgorithmEvent;
use crate::listener::{EventSink, ListenerSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use traverse_core::scheduler::TimerHandle;
use traverse_core::timing::{self, MIN_BUDGET_FOR_TIMED_TASK, TIMEOUT_PRECAUTION_OFFSET};
use traverse_core::{AlgorithmError, CancellationToken, ContextId, Scheduler};
use traverse_model::SearchPath;

/// Lifecycle state of a resumable algorithm instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmState {
    /// Built but never stepped.
    Created,
    /// Currently inside a `step()` call.
    Active,
    /// Between steps, resumable.
    Inactive,
    /// Ran out of work; stepping again is an error.
    Terminated,
    /// A fatal error ended the run; stepping again is an error.
    Failed,
}

impl AlgorithmState {
    /// `true` for the two absorbing states.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlgorithmState::Terminated | AlgorithmState::Failed)
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStatistics {
    /// Completed `step()` calls.
    pub steps: u64,
    /// Nodes whose successors were generated.
    pub nodes_expanded: u64,
    /// Solutions reported.
    pub solutions_found: u64,
    /// Candidates dropped because their evaluation failed.
    pub evaluation_failures: u64,
    /// Wall-clock time from the first step to termination.
    pub total_time: Duration,
}

impl std::fmt::Display for SearchStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "steps:               {}", self.steps)?;
        writeln!(f, "nodes expanded:      {}", self.nodes_expanded)?;
        writeln!(f, "solutions found:     {}", self.solutions_found)?;
        writeln!(f, "evaluation failures: {}", self.evaluation_failures)?;
        write!(f, "total time:          {:?}", self.total_time)
    }
}

/// Why a completed run stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// The strategy ran out of work.
    Exhausted,
    /// A fatal error ended the run early.
    Failed(AlgorithmError),
}

/// The folded result of driving an instance to completion.
#[derive(Debug, Clone)]
pub struct RunOutcome<S, A> {
    /// Every solution reported during the run, in discovery order.
    pub solutions: Vec<SearchPath<S, A>>,
    /// Why the run stopped.
    pub termination: Termination,
    /// The final counters.
    pub statistics: SearchStatistics,
}

impl<S, A> RunOutcome<S, A> {
    /// The first solution, if any was found.
    #[inline]
    pub fn best_solution(&self) -> Option<&SearchPath<S, A>> {
        self.solutions.first()
    }
}

/// Cancels a running instance from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Requests cancellation. The instance notices at its next safe point.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// The shared lifecycle machinery of every strategy.
pub struct AlgorithmCore<S, A> {
    scheduler: Arc<Scheduler>,
    context: ContextId,
    token: CancellationToken,
    state: AlgorithmState,
    listeners: ListenerSet<S, A>,
    stats: SearchStatistics,
    budget: Option<Duration>,
    deadline: Option<Instant>,
    started: Option<Instant>,
    timer: Option<TimerHandle>,
}

impl<S, A> AlgorithmCore<S, A> {
    /// A fresh core in state `Created`, without a deadline.
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        AlgorithmCore {
            scheduler,
            context: ContextId::fresh(),
            token: CancellationToken::new(),
            state: AlgorithmState::Created,
            listeners: ListenerSet::new(),
            stats: SearchStatistics::default(),
            budget: None,
            deadline: None,
            started: None,
            timer: None,
        }
    }

    /// Sets the overall run budget. Must be called before the first step.
    pub fn set_timeout(&mut self, budget: Duration) {
        debug_assert_eq!(self.state, AlgorithmState::Created);
        self.budget = Some(budget);
    }

    /// The lifecycle state.
    #[inline(always)]
    pub fn state(&self) -> AlgorithmState {
        self.state
    }

    /// The execution context of this instance.
    #[inline(always)]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// The cancellation token threaded through this instance's calls.
    #[inline(always)]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// A handle for cancelling this instance from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.token.clone(),
        }
    }

    /// The accumulated counters.
    #[inline(always)]
    pub fn statistics(&self) -> &SearchStatistics {
        &self.stats
    }

    /// Registers an event listener.
    pub fn register_listener(&mut self, sink: impl EventSink<S, A> + Send + 'static) {
        self.listeners.register(sink);
    }

    /// `true` before the first step.
    #[inline]
    pub fn is_created(&self) -> bool {
        self.state == AlgorithmState::Created
    }

    /// Enters a `step()` call: rejects terminal states, starts the clock on
    /// the first step and runs the termination check. On a fatal error the
    /// instance moves to `Failed` before the error propagates.
    pub fn begin_step(&mut self) -> Result<(), AlgorithmError> {
        match self.state {
            AlgorithmState::Terminated | AlgorithmState::Failed => {
                return Err(AlgorithmError::illegal_state(
                    "step() on a terminated instance",
                ));
            }
            AlgorithmState::Active => {
                return Err(AlgorithmError::illegal_state(
                    "step() re-entered while a step is active",
                ));
            }
            AlgorithmState::Created => {
                let now = Instant::now();
                self.started = Some(now);
                if let Some(budget) = self.budget {
                    self.deadline = Some(now + budget);
                    self.timer = Some(self.scheduler.schedule_interrupt(
                        self.context,
                        self.token.clone(),
                        budget,
                        "overall run budget",
                    ));
                }
                tracing::debug!(context = self.context.value(), budget = ?self.budget, "run started");
            }
            AlgorithmState::Inactive => {}
        }
        self.state = AlgorithmState::Active;
        if let Err(err) = self.check_termination() {
            self.fail(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Checks for a requested stop, in the precedence external signal, then
    /// cancellation, then deadline.
    pub fn check_termination(&self) -> Result<(), AlgorithmError> {
        match self.token.check() {
            Ok(()) => {}
            Err(AlgorithmError::Cancelled) if !self.token.is_manually_cancelled() => {
                // Tripped by the run-budget interrupt.
                return Err(self.timeout_error());
            }
            Err(err) => return Err(err),
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(self.timeout_error());
            }
        }
        Ok(())
    }

    fn timeout_error(&self) -> AlgorithmError {
        let exceeded_by = self
            .deadline
            .map(|deadline| Instant::now().saturating_duration_since(deadline))
            .unwrap_or_default();
        AlgorithmError::Timeout { exceeded_by }
    }

    /// Restates a fatal error by its actual cause before the instance
    /// fails: a `Cancelled` observed without a manual cancel means the
    /// run-budget interrupt tripped the token while the work was running,
    /// so the run ended on its deadline, not on a caller request.
    pub fn classify(&self, err: AlgorithmError) -> AlgorithmError {
        match err {
            AlgorithmError::Cancelled if !self.token.is_manually_cancelled() => {
                self.timeout_error()
            }
            other => other,
        }
    }

    /// Time left until the overall deadline, `None` if no budget is set.
    pub fn remaining_budget(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Runs `work` under what is left of the overall budget, minus a safety
    /// margin so the inner deadline fires before the outer one. Without an
    /// overall budget, `work` runs unguarded.
    pub fn compute_timeout_aware<T, F>(
        &self,
        reason: &str,
        work: F,
    ) -> Result<T, AlgorithmError>
    where
        F: FnOnce() -> Result<T, AlgorithmError>,
    {
        let Some(remaining) = self.remaining_budget() else {
            return work();
        };
        let inner_budget = remaining.saturating_sub(TIMEOUT_PRECAUTION_OFFSET);
        if inner_budget < MIN_BUDGET_FOR_TIMED_TASK {
            // Not worth arming a timer; the step-level deadline check
            // catches the overrun.
            return work();
        }
        timing::compute(
            &self.scheduler,
            self.context,
            &self.token,
            inner_budget,
            reason,
            work,
        )
    }

    /// Emits an intra-step observation to the listeners. Does not count as
    /// the step's event and does not change state.
    pub fn emit(&self, event: AlgorithmEvent<S, A>) {
        self.listeners.broadcast(&event);
    }

    /// Finishes a successful `step()`: counts it, fans the event out and
    /// settles the next state.
    pub fn complete_step(&mut self, event: &AlgorithmEvent<S, A>) {
        debug_assert_eq!(self.state, AlgorithmState::Active);
        self.stats.steps += 1;
        self.listeners.broadcast(event);
        if event.is_terminal() {
            self.state = AlgorithmState::Terminated;
            self.shutdown_clock();
            tracing::debug!(context = self.context.value(), stats = %self.stats, "run terminated");
        } else {
            self.state = AlgorithmState::Inactive;
        }
    }

    /// Moves the instance to `Failed` and releases its timer resources.
    pub fn fail(&mut self, err: &AlgorithmError) {
        debug_assert!(err.is_fatal());
        self.state = AlgorithmState::Failed;
        self.shutdown_clock();
        tracing::debug!(context = self.context.value(), error = %err, "run failed");
    }

    fn shutdown_clock(&mut self) {
        if let Some(timer) = self.timer.take() {
            if !self.scheduler.cancel(timer) {
                self.scheduler
                    .registry()
                    .mark_resolved(self.context, timer.interrupt);
            }
        }
        if let Some(started) = self.started {
            self.stats.total_time = started.elapsed();
        }
    }

    /// Counts one node expansion.
    #[inline]
    pub fn note_expansion(&mut self) {
        self.stats.nodes_expanded += 1;
    }

    /// Counts one reported solution.
    #[inline]
    pub fn note_solution(&mut self) {
        self.stats.solutions_found += 1;
    }

    /// Counts one dropped candidate and tells the listeners about it.
    pub fn note_evaluation_failure(&mut self, detail: &AlgorithmError) {
        self.stats.evaluation_failures += 1;
        self.listeners.broadcast(&AlgorithmEvent::Custom {
            name: "evaluation_failed",
            payload: detail.to_string(),
        });
    }
}

impl<S, A> std::fmt::Debug for AlgorithmCore<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmCore")
            .field("context", &self.context)
            .field("state", &self.state)
            .field("budget", &self.budget)
            .field("stats", &self.stats)
            .finish()
    }
}

/// A search strategy driven one event at a time.
pub trait ResumableAlgorithm<S, A> {
    /// The lifecycle state.
    fn state(&self) -> AlgorithmState;

    /// Performs one bounded unit of work and returns its event.
    fn step(&mut self) -> Result<AlgorithmEvent<S, A>, AlgorithmError>;

    /// A handle for cancelling the instance from another thread.
    fn cancel_handle(&self) -> CancelHandle;

    /// The accumulated counters.
    fn statistics(&self) -> &SearchStatistics;

    /// Drives `step()` until the instance terminates or fails, folding the
    /// run into a [`RunOutcome`].
    fn run_to_completion(&mut self) -> RunOutcome<S, A>
    where
        S: Clone,
        A: Clone,
    {
        let mut solutions = Vec::new();
        loop {
            match self.step() {
                Ok(event) => {
                    if let AlgorithmEvent::SolutionFound(path) = &event {
                        solutions.push(path.clone());
                    }
                    if event.is_terminal() {
                        return RunOutcome {
                            solutions,
                            termination: Termination::Exhausted,
                            statistics: self.statistics().clone(),
                        };
                    }
                }
                Err(err) => {
                    return RunOutcome {
                        solutions,
                        termination: Termination::Failed(err),
                        statistics: self.statistics().clone(),
                    };
                }
            }
        }
    }
}
