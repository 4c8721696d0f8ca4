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

//! # Algorithm Events
//!
//! Every call to `step()` yields exactly one event, and the same events fan
//! out to registered listeners. The event stream is the public record of a
//! run: what was expanded, what was found, and when the strategy ran out of
//! work.

use traverse_model::{NodeId, SearchPath};

/// One observable occurrence during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmEvent<S, A> {
    /// The instance moved out of `Created`; roots are in place.
    Initialized,
    /// A node was expanded into one of its children.
    NodeExpanded {
        /// The expanded node.
        parent: NodeId,
        /// The newly created child.
        child: NodeId,
        /// The action leading to the child.
        action: A,
    },
    /// A candidate passed the goal test.
    SolutionFound(SearchPath<S, A>),
    /// The current iteration ran out of candidates but the strategy has
    /// more iterations to go (e.g. a widened discrepancy bound).
    NoMoreCandidates,
    /// A strategy-specific occurrence, identified by name.
    Custom {
        /// Stable identifier of the occurrence.
        name: &'static str,
        /// Free-form detail.
        payload: String,
    },
    /// The strategy is exhausted; the instance is terminated.
    Finished,
}

impl<S, A> AlgorithmEvent<S, A> {
    /// Stable name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmEvent::Initialized => "initialized",
            AlgorithmEvent::NodeExpanded { .. } => "node_expanded",
            AlgorithmEvent::SolutionFound(_) => "solution_found",
            AlgorithmEvent::NoMoreCandidates => "no_more_candidates",
            AlgorithmEvent::Custom { name, .. } => name,
            AlgorithmEvent::Finished => "finished",
        }
    }

    /// The solution path, if this is a [`AlgorithmEvent::SolutionFound`].
    pub fn solution(&self) -> Option<&SearchPath<S, A>> {
        match self {
            AlgorithmEvent::SolutionFound(path) => Some(path),
            _ => None,
        }
    }

    /// `true` if this event ends the run.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlgorithmEvent::Finished)
    }
}

impl<S, A> std::fmt::Display for AlgorithmEvent<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmEvent::NodeExpanded { parent, child, .. } => {
                write!(f, "node_expanded({parent} -> {child})")
            }
            AlgorithmEvent::SolutionFound(path) => {
                write!(f, "solution_found({} states)", path.len())
            }
            AlgorithmEvent::Custom { name, payload } => write!(f, "{name}({payload})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_stable() {
        let event: AlgorithmEvent<u32, char> = AlgorithmEvent::Initialized;
        assert_eq!(event.name(), "initialized");
        let event: AlgorithmEvent<u32, char> = AlgorithmEvent::Custom {
            name: "evaluation_failed",
            payload: "candidate dropped".to_string(),
        };
        assert_eq!(event.name(), "evaluation_failed");
    }

    #[test]
    fn test_solution_accessor() {
        let path = SearchPath::root(3u32);
        let event: AlgorithmEvent<u32, char> = AlgorithmEvent::SolutionFound(path.clone());
        assert_eq!(event.solution(), Some(&path));
        assert!(AlgorithmEvent::<u32, char>::Finished.solution().is_none());
    }

    #[test]
    fn test_only_finished_is_terminal() {
        assert!(AlgorithmEvent::<u32, char>::Finished.is_terminal());
        assert!(!AlgorithmEvent::<u32, char>::NoMoreCandidates.is_terminal());
    }
}
