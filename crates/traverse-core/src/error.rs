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

//! # Error Taxonomy
//!
//! One error enum shared by every component of the engine. The taxonomy
//! distinguishes fatal conditions (`Timeout`, `Cancelled`) from recoverable
//! ones (`EvaluationFailed`), API misuse (`IllegalState`) and signals that
//! did not originate in the interrupt registry (`InterruptedExternally`).
//!
//! `EvaluationFailed` refers to a single candidate whose evaluator or
//! successor call errored; strategies drop the candidate and continue.
//! `Timeout` and `Cancelled` are fatal to the running instance; before they
//! propagate, the instance must leave the interrupt registry clean (no
//! unresolved interrupts, no pending timer tasks). `InterruptedExternally`
//! must be re-raised by every layer, never swallowed.

use std::time::Duration;
use thiserror::Error;

/// The error taxonomy of the search engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlgorithmError {
    /// The computation exceeded its deadline.
    #[error("computation timed out (deadline exceeded by {exceeded_by:?})")]
    Timeout {
        /// How far past the deadline the timeout was detected.
        exceeded_by: Duration,
    },

    /// The execution was cancelled through its cancellation token.
    #[error("execution was cancelled")]
    Cancelled,

    /// A single candidate's evaluator or successor call errored.
    /// Recoverable: the candidate is dropped and the search continues.
    #[error("candidate evaluation failed: {0}")]
    EvaluationFailed(String),

    /// API misuse, e.g. stepping an algorithm that is already terminal.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A signal from outside the interrupt registry reached the execution
    /// context. Must be re-raised, never swallowed.
    #[error("interrupted by a signal from outside the interrupt registry")]
    InterruptedExternally,
}

impl AlgorithmError {
    /// Returns `true` if the error refers to a single candidate and the
    /// search may continue after dropping that candidate.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AlgorithmError::EvaluationFailed(_))
    }

    /// Returns `true` if the error terminates the running instance.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Convenience constructor for [`AlgorithmError::IllegalState`].
    #[inline]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        AlgorithmError::IllegalState(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::AlgorithmError;
    use std::time::Duration;

    #[test]
    fn test_evaluation_failed_is_recoverable() {
        let err = AlgorithmError::EvaluationFailed("division by zero".to_string());
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_timeout_and_cancelled_are_fatal() {
        let timeout = AlgorithmError::Timeout {
            exceeded_by: Duration::from_millis(5),
        };
        assert!(timeout.is_fatal());
        assert!(AlgorithmError::Cancelled.is_fatal());
        assert!(AlgorithmError::InterruptedExternally.is_fatal());
    }

    #[test]
    fn test_display_messages_name_the_condition() {
        let err = AlgorithmError::illegal_state("step() after termination");
        assert_eq!(
            err.to_string(),
            "illegal state: step() after termination"
        );
        assert_eq!(
            AlgorithmError::Cancelled.to_string(),
            "execution was cancelled"
        );
    }
}
