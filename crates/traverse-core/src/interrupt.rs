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

//! # Interrupt Registry
//!
//! ## Motivation
//!
//! An interruptible engine needs to tell *who* interrupted a computation and
//! *why*. A raw cancellation flag cannot: with nested deadlines, an inner
//! budget expiring must not be mistaken for the outer budget expiring, and a
//! signal nobody registered must not be mistaken for either. The registry
//! gives every interrupt an identity, an owning execution context and a
//! human-readable reason, and tracks it from registration over firing to
//! resolution.
//!
//! ## Highlights
//!
//! - [`CancellationToken`]: a cheaply clonable flag shared by one execution
//!   context and every timer interrupt aimed at it.
//! - [`InterruptRegistry`]: bookkeeping of open, fired and resolved
//!   interrupts per context. A context is only clean once every fired
//!   interrupt has been resolved.
//! - Resolution discipline: with nested deadlines the innermost computation
//!   resolves its interrupt first, so after all nested computations return
//!   the context reports zero unresolved interrupts.

use crate::error::AlgorithmError;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Identifies one execution context (one running algorithm instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a fresh, process-unique context id.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    #[inline(always)]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Identifies one registered interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterruptId(u64);

impl InterruptId {
    /// Returns the raw id value.
    #[inline(always)]
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    /// Set by [`CancellationToken::cancel`], never cleared. Distinguishes a
    /// caller-requested cancellation from a timer-driven one, which is
    /// withdrawn again once its interrupt is resolved.
    manual: AtomicBool,
    external: AtomicBool,
    /// Fired but not yet resolved interrupts aimed at this token.
    pending_interrupts: AtomicUsize,
}

/// A cheaply clonable cancellation flag.
///
/// One token is threaded through all calls of one execution context. Both
/// the caller (via [`cancel`](CancellationToken::cancel)) and the interrupt
/// registry (when a deadline fires) set it; computations poll it at safe
/// points via [`check`](CancellationToken::check).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// Creates a new, unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation on behalf of the caller. Unlike a timer-driven
    /// interrupt this is never withdrawn.
    pub fn cancel(&self) {
        self.state.manual.store(true, Ordering::SeqCst);
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    /// Marks the token as tripped by a signal from outside the interrupt
    /// registry. Computations observing this must propagate
    /// [`AlgorithmError::InterruptedExternally`].
    pub fn mark_external(&self) {
        self.state.external.store(true, Ordering::SeqCst);
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if cancellation has been requested and not withdrawn.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `true` if the caller requested cancellation directly.
    #[inline]
    pub fn is_manually_cancelled(&self) -> bool {
        self.state.manual.load(Ordering::SeqCst)
    }

    /// Polls the token. Returns `Err` if cancellation has been requested,
    /// with [`AlgorithmError::InterruptedExternally`] taking precedence over
    /// [`AlgorithmError::Cancelled`].
    #[inline]
    pub fn check(&self) -> Result<(), AlgorithmError> {
        if !self.is_cancelled() {
            return Ok(());
        }
        if self.state.external.load(Ordering::SeqCst) {
            Err(AlgorithmError::InterruptedExternally)
        } else {
            Err(AlgorithmError::Cancelled)
        }
    }

    /// Number of fired but unresolved timer interrupts aimed at this token.
    #[inline]
    pub fn pending_interrupts(&self) -> usize {
        self.state.pending_interrupts.load(Ordering::SeqCst)
    }

    fn trip_for_interrupt(&self) {
        self.state.pending_interrupts.fetch_add(1, Ordering::SeqCst);
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    fn resolve_interrupt(&self) {
        let before = self.state.pending_interrupts.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(before > 0, "resolving an interrupt that never fired");
        // Withdraw the cancellation once nothing else keeps it alive. A
        // manual cancel or an external signal is never withdrawn.
        if before == 1
            && !self.state.manual.load(Ordering::SeqCst)
            && !self.state.external.load(Ordering::SeqCst)
        {
            self.state.cancelled.store(false, Ordering::SeqCst);
        }
    }
}

#[derive(Debug)]
struct InterruptRecord {
    context: ContextId,
    token: CancellationToken,
    reason: String,
    fired: bool,
    resolved: bool,
}

/// Tracks every interrupt from registration over firing to resolution.
///
/// A context is *clean* once [`has_unresolved_interrupts`] reports `false`;
/// a timed computation must not propagate a timeout before its own interrupt
/// is resolved.
///
/// [`has_unresolved_interrupts`]: InterruptRegistry::has_unresolved_interrupts
#[derive(Debug, Default)]
pub struct InterruptRegistry {
    records: Mutex<FxHashMap<InterruptId, InterruptRecord>>,
    next_id: AtomicU64,
}

impl InterruptRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interrupt aimed at `context` through `token`. The
    /// interrupt is open until it either fires or is discarded.
    pub fn register(
        &self,
        context: ContextId,
        token: CancellationToken,
        reason: impl Into<String>,
    ) -> InterruptId {
        let id = InterruptId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = InterruptRecord {
            context,
            token,
            reason: reason.into(),
            fired: false,
            resolved: false,
        };
        self.records.lock().unwrap().insert(id, record);
        id
    }

    /// Fires a registered interrupt: trips its token and marks it as
    /// unresolved. Returns `false` if the interrupt is unknown, already
    /// fired or discarded.
    pub fn fire(&self, id: InterruptId) -> bool {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&id) {
            Some(record) if !record.fired => {
                record.fired = true;
                tracing::debug!(
                    interrupt = id.value(),
                    context = record.context.value(),
                    reason = %record.reason,
                    "interrupt fired"
                );
                record.token.trip_for_interrupt();
                true
            }
            _ => false,
        }
    }

    /// Marks a fired interrupt as resolved, withdrawing its effect on the
    /// token if nothing else keeps the cancellation alive. Returns `false`
    /// if the interrupt is unknown, never fired or already resolved.
    pub fn mark_resolved(&self, context: ContextId, id: InterruptId) -> bool {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&id) {
            Some(record) if record.context == context && record.fired && !record.resolved => {
                record.resolved = true;
                record.token.resolve_interrupt();
                tracing::debug!(
                    interrupt = id.value(),
                    context = context.value(),
                    "interrupt resolved"
                );
                true
            }
            _ => false,
        }
    }

    /// Removes an interrupt that never fired, e.g. because the guarded
    /// computation finished within its budget. Returns `false` if the
    /// interrupt is unknown or has already fired.
    pub fn discard(&self, id: InterruptId) -> bool {
        let mut records = self.records.lock().unwrap();
        match records.get(&id) {
            Some(record) if !record.fired => {
                records.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if `context` has at least one fired but unresolved
    /// interrupt.
    pub fn has_unresolved_interrupts(&self, context: ContextId) -> bool {
        self.unresolved_count(context) > 0
    }

    /// Number of fired but unresolved interrupts of `context`.
    pub fn unresolved_count(&self, context: ContextId) -> usize {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.context == context && r.fired && !r.resolved)
            .count()
    }

    /// The reason an interrupt was registered with, if it is still known.
    pub fn reason(&self, id: InterruptId) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .map(|r| r.reason.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_ids_are_unique() {
        let a = ContextId::fresh();
        let b = ContextId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_cancel_and_check() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(AlgorithmError::Cancelled));
    }

    #[test]
    fn test_external_signal_takes_precedence() {
        let token = CancellationToken::new();
        token.cancel();
        token.mark_external();
        assert_eq!(token.check(), Err(AlgorithmError::InterruptedExternally));
    }

    #[test]
    fn test_fire_trips_token_and_resolve_withdraws_it() {
        let registry = InterruptRegistry::new();
        let context = ContextId::fresh();
        let token = CancellationToken::new();
        let id = registry.register(context, token.clone(), "budget of step 3");

        assert!(registry.fire(id));
        assert!(token.is_cancelled());
        assert_eq!(token.pending_interrupts(), 1);
        assert!(registry.has_unresolved_interrupts(context));

        assert!(registry.mark_resolved(context, id));
        assert!(!token.is_cancelled());
        assert_eq!(token.pending_interrupts(), 0);
        assert!(!registry.has_unresolved_interrupts(context));
    }

    #[test]
    fn test_manual_cancel_survives_interrupt_resolution() {
        let registry = InterruptRegistry::new();
        let context = ContextId::fresh();
        let token = CancellationToken::new();
        let id = registry.register(context, token.clone(), "budget");

        token.cancel();
        registry.fire(id);
        registry.mark_resolved(context, id);
        // The caller's cancellation is not withdrawn.
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_nested_interrupts_resolve_innermost_first() {
        let registry = InterruptRegistry::new();
        let context = ContextId::fresh();
        let token = CancellationToken::new();
        let outer = registry.register(context, token.clone(), "outer budget");
        let inner = registry.register(context, token.clone(), "inner budget");

        registry.fire(inner);
        registry.fire(outer);
        assert_eq!(registry.unresolved_count(context), 2);
        assert_eq!(token.pending_interrupts(), 2);

        assert!(registry.mark_resolved(context, inner));
        // The outer interrupt still holds the token.
        assert!(token.is_cancelled());
        assert!(registry.mark_resolved(context, outer));
        assert!(!token.is_cancelled());
        assert_eq!(registry.unresolved_count(context), 0);
    }

    #[test]
    fn test_resolve_rejects_foreign_context() {
        let registry = InterruptRegistry::new();
        let context = ContextId::fresh();
        let other = ContextId::fresh();
        let token = CancellationToken::new();
        let id = registry.register(context, token, "budget");

        registry.fire(id);
        assert!(!registry.mark_resolved(other, id));
        assert!(registry.has_unresolved_interrupts(context));
    }

    #[test]
    fn test_discard_only_before_firing() {
        let registry = InterruptRegistry::new();
        let context = ContextId::fresh();
        let token = CancellationToken::new();

        let unfired = registry.register(context, token.clone(), "budget");
        assert!(registry.discard(unfired));
        assert!(!registry.fire(unfired));

        let fired = registry.register(context, token, "budget");
        registry.fire(fired);
        assert!(!registry.discard(fired));
    }
}
