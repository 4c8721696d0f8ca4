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

//! # Timed Computations
//!
//! ## Motivation
//!
//! Wrapping a closure with a deadline is easy; doing it so that *nested*
//! deadlines compose is not. [`compute`] guarantees that whoever armed a
//! deadline also resolves it, innermost first, so after a stack of nested
//! timed computations unwinds the execution context reports zero unresolved
//! interrupts and zero pending timer tasks, no matter which budget expired.
//!
//! ## Usage
//!
//! ```ignore
//! let outcome = timing::compute(&scheduler, context, &token, budget, "node eval", || {
//!     expensive_work(&token)
//! });
//! ```
//!
//! The closure must poll the token at safe points; a closure that never
//! polls will simply run to completion and return its own result.

use crate::error::AlgorithmError;
use crate::interrupt::{CancellationToken, ContextId};
use crate::scheduler::Scheduler;
use std::time::{Duration, Instant};

/// Safety margin subtracted from a remaining budget before handing it to a
/// timed task, so the task's own deadline fires before the enclosing one.
pub const TIMEOUT_PRECAUTION_OFFSET: Duration = Duration::from_millis(100);

/// Below this remaining budget a timed task is not worth starting; callers
/// should report a timeout right away instead.
pub const MIN_BUDGET_FOR_TIMED_TASK: Duration = Duration::from_millis(50);

/// Runs `work` under a deadline of `budget`.
///
/// The deadline is armed on `scheduler` against `token` before `work` starts
/// and withdrawn (or, if it fired, resolved) after `work` returns, so the
/// registry is clean for `context` again once this call returns, whichever
/// way it ends.
///
/// Outcome mapping:
/// - `work` returns before the deadline fires: its result passes through.
/// - The deadline fires and `work` returns [`AlgorithmError::Cancelled`]
///   without the caller having cancelled the token: the error becomes
///   [`AlgorithmError::Timeout`].
/// - The deadline fires but the caller also cancelled the token directly:
///   [`AlgorithmError::Cancelled`] stands. The caller asked first.
/// - The deadline fires but `work` completes anyway (it passed its last
///   poll point before the trip): the completion wins and the interrupt is
///   resolved quietly.
pub fn compute<T, F>(
    scheduler: &Scheduler,
    context: ContextId,
    token: &CancellationToken,
    budget: Duration,
    reason: impl Into<String>,
    work: F,
) -> Result<T, AlgorithmError>
where
    F: FnOnce() -> Result<T, AlgorithmError>,
{
    let started = Instant::now();
    let handle = scheduler.schedule_interrupt(context, token.clone(), budget, reason);
    let result = work();

    if scheduler.cancel(handle) {
        // Deadline never fired; nothing to resolve.
        return result;
    }
    scheduler.registry().mark_resolved(context, handle.interrupt);

    match result {
        Err(AlgorithmError::Cancelled) if !token.is_manually_cancelled() => {
            let exceeded_by = started.elapsed().saturating_sub(budget);
            tracing::debug!(
                context = context.value(),
                ?budget,
                ?exceeded_by,
                "timed computation ran over its budget"
            );
            Err(AlgorithmError::Timeout { exceeded_by })
        }
        other => other,
    }
}
