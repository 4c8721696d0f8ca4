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

//! # Deadline Scheduler
//!
//! ## Motivation
//!
//! Deadlines must fire even while the guarded computation is busy, so they
//! are armed on a dedicated timer thread instead of being polled by the
//! computation itself. The scheduler is an explicit value passed to whoever
//! needs it; sharing happens through `Arc<Scheduler>`, not through process
//! globals.
//!
//! ## Highlights
//!
//! - One worker thread, a priority queue ordered by fire time, a condvar to
//!   wake the worker when an earlier deadline arrives.
//! - Firing goes through the owned [`InterruptRegistry`], so every deadline
//!   carries an identity and a reason.
//! - [`Scheduler::cancel`] withdraws a deadline that has not fired yet and
//!   reports whether it was in time, which is exactly the information a
//!   timed computation needs to tell a timeout from a normal return.
//! - Dropping the scheduler shuts the worker down and joins it.

use crate::interrupt::{CancellationToken, ContextId, InterruptId, InterruptRegistry};
use rustc_hash::FxHashSet;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Identifies one scheduled timer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Handle to one armed deadline, used to withdraw or resolve it.
#[derive(Debug, Clone, Copy)]
pub struct TimerHandle {
    /// The queue entry on the timer thread. Unused for zero-delay deadlines,
    /// which fire inline.
    pub task: TaskId,
    /// The interrupt the deadline fires through.
    pub interrupt: InterruptId,
}

#[derive(Debug, PartialEq, Eq)]
struct PendingTask {
    fire_at: Instant,
    task: TaskId,
    interrupt: InterruptId,
}

impl Ord for PendingTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.fire_at
            .cmp(&other.fire_at)
            .then(self.task.cmp(&other.task))
    }
}

impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
struct SchedulerInner {
    queue: BinaryHeap<Reverse<PendingTask>>,
    /// Withdrawn tasks still sitting in the queue. The worker drops them
    /// silently when they surface.
    withdrawn: FxHashSet<TaskId>,
    pending: usize,
    next_task: u64,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<SchedulerInner>,
    signal: Condvar,
    registry: InterruptRegistry,
}

/// A timer thread that fires deadline interrupts through an
/// [`InterruptRegistry`].
///
/// Share one scheduler among the algorithms of a process via
/// `Arc<Scheduler>`.
#[derive(Debug)]
pub struct Scheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Creates a scheduler and spawns its timer thread.
    pub fn new() -> Self {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("traverse-timer".to_string())
            .spawn(move || Self::worker_loop(worker_shared))
            .expect("failed to spawn the timer thread");
        Scheduler {
            shared,
            worker: Some(worker),
        }
    }

    /// The interrupt registry all deadlines of this scheduler fire through.
    #[inline]
    pub fn registry(&self) -> &InterruptRegistry {
        &self.shared.registry
    }

    /// Arms a deadline: after `delay`, `token` is tripped through a fresh
    /// interrupt aimed at `context`. A zero delay fires inline before this
    /// call returns.
    pub fn schedule_interrupt(
        &self,
        context: ContextId,
        token: CancellationToken,
        delay: Duration,
        reason: impl Into<String>,
    ) -> TimerHandle {
        let reason = reason.into();
        let interrupt = self.shared.registry.register(context, token, reason.clone());

        let mut inner = self.shared.inner.lock().unwrap();
        let task = TaskId(inner.next_task);
        inner.next_task += 1;

        if delay.is_zero() {
            drop(inner);
            tracing::debug!(context = context.value(), reason = %reason, "zero delay, firing inline");
            self.shared.registry.fire(interrupt);
            return TimerHandle { task, interrupt };
        }

        inner.queue.push(Reverse(PendingTask {
            fire_at: Instant::now() + delay,
            task,
            interrupt,
        }));
        inner.pending += 1;
        drop(inner);
        self.shared.signal.notify_all();
        TimerHandle { task, interrupt }
    }

    /// Withdraws a deadline. Returns `true` if it had not fired yet; the
    /// interrupt is discarded and the token stays untouched. Returns `false`
    /// if the deadline already fired, in which case the caller owns the
    /// resolution of the interrupt.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        let mut inner = self.shared.inner.lock().unwrap();
        if !self.shared.registry.discard(handle.interrupt) {
            return false;
        }
        if inner.withdrawn.insert(handle.task) {
            inner.pending = inner.pending.saturating_sub(1);
        }
        true
    }

    /// Number of armed deadlines that have neither fired nor been withdrawn.
    pub fn pending_tasks(&self) -> usize {
        self.shared.inner.lock().unwrap().pending
    }

    fn worker_loop(shared: Arc<Shared>) {
        let mut inner = shared.inner.lock().unwrap();
        loop {
            if inner.shutdown {
                return;
            }
            let now = Instant::now();
            match inner.queue.peek() {
                Some(Reverse(head)) if inner.withdrawn.contains(&head.task) => {
                    let task = head.task;
                    inner.queue.pop();
                    inner.withdrawn.remove(&task);
                }
                Some(Reverse(head)) if head.fire_at <= now => {
                    let Reverse(task) = inner.queue.pop().unwrap();
                    inner.pending = inner.pending.saturating_sub(1);
                    shared.registry.fire(task.interrupt);
                }
                Some(Reverse(head)) => {
                    let wait = head.fire_at - now;
                    inner = shared.signal.wait_timeout(inner, wait).unwrap().0;
                }
                None => {
                    inner = shared.signal.wait(inner).unwrap();
                }
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.inner.lock().unwrap().shutdown = true;
        self.shared.signal.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn test_deadline_fires_and_trips_token() {
        let scheduler = Scheduler::new();
        let context = ContextId::fresh();
        let token = CancellationToken::new();

        let handle = scheduler.schedule_interrupt(
            context,
            token.clone(),
            Duration::from_millis(20),
            "test budget",
        );
        assert_eq!(scheduler.pending_tasks(), 1);
        assert!(!token.is_cancelled());

        assert!(wait_until(Duration::from_secs(2), || token.is_cancelled()));
        assert_eq!(scheduler.pending_tasks(), 0);
        assert!(scheduler.registry().has_unresolved_interrupts(context));

        assert!(scheduler.registry().mark_resolved(context, handle.interrupt));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_before_firing_leaves_token_untouched() {
        let scheduler = Scheduler::new();
        let context = ContextId::fresh();
        let token = CancellationToken::new();

        let handle =
            scheduler.schedule_interrupt(context, token.clone(), Duration::from_secs(60), "budget");
        assert!(scheduler.cancel(handle));
        assert_eq!(scheduler.pending_tasks(), 0);
        assert!(!token.is_cancelled());
        assert!(!scheduler.registry().has_unresolved_interrupts(context));
        // A second cancel is a no-op.
        assert!(!scheduler.cancel(handle));
    }

    #[test]
    fn test_cancel_after_firing_reports_too_late() {
        let scheduler = Scheduler::new();
        let context = ContextId::fresh();
        let token = CancellationToken::new();

        let handle = scheduler.schedule_interrupt(
            context,
            token.clone(),
            Duration::from_millis(10),
            "budget",
        );
        assert!(wait_until(Duration::from_secs(2), || token.is_cancelled()));
        assert!(!scheduler.cancel(handle));
        // The caller now owns the resolution.
        assert!(scheduler.registry().mark_resolved(context, handle.interrupt));
    }

    #[test]
    fn test_zero_delay_fires_inline() {
        let scheduler = Scheduler::new();
        let context = ContextId::fresh();
        let token = CancellationToken::new();

        let handle =
            scheduler.schedule_interrupt(context, token.clone(), Duration::ZERO, "no budget");
        assert!(token.is_cancelled());
        assert_eq!(scheduler.pending_tasks(), 0);
        assert!(!scheduler.cancel(handle));
        assert!(scheduler.registry().mark_resolved(context, handle.interrupt));
    }

    #[test]
    fn test_earlier_deadline_preempts_later_one() {
        let scheduler = Scheduler::new();
        let context = ContextId::fresh();
        let slow = CancellationToken::new();
        let fast = CancellationToken::new();

        let slow_handle =
            scheduler.schedule_interrupt(context, slow.clone(), Duration::from_secs(60), "slow");
        scheduler.schedule_interrupt(
            context,
            fast.clone(),
            Duration::from_millis(15),
            "fast",
        );

        assert!(wait_until(Duration::from_secs(2), || fast.is_cancelled()));
        assert!(!slow.is_cancelled());
        assert!(scheduler.cancel(slow_handle));
    }
}
