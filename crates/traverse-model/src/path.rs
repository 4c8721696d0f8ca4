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

//! # Search Paths
//!
//! A root-to-node walk through the search space. Paths are the currency of
//! the engine: goal tests may inspect them, evaluators score them, and
//! solutions are reported as them.

/// A walk from a root state to some reached state.
///
/// Invariant: `actions.len() == states.len() - 1`; `actions[i]` leads from
/// `states[i]` to `states[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPath<S, A> {
    states: Vec<S>,
    actions: Vec<A>,
    score: Option<f64>,
}

impl<S, A> SearchPath<S, A> {
    /// A path consisting of a single root state.
    pub fn root(state: S) -> Self {
        SearchPath {
            states: vec![state],
            actions: Vec::new(),
            score: None,
        }
    }

    /// Builds a path from its parts.
    ///
    /// # Panics
    ///
    /// Panics if `actions.len() + 1 != states.len()`.
    pub fn new(states: Vec<S>, actions: Vec<A>) -> Self {
        assert_eq!(
            actions.len() + 1,
            states.len(),
            "a path over n states carries n - 1 actions"
        );
        SearchPath {
            states,
            actions,
            score: None,
        }
    }

    /// The states along the path, root first.
    #[inline(always)]
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// The actions along the path, in travel order.
    #[inline(always)]
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    /// The state the path ends in.
    #[inline]
    pub fn head(&self) -> &S {
        self.states.last().expect("a path is never empty")
    }

    /// The root state.
    #[inline]
    pub fn tail(&self) -> &S {
        &self.states[0]
    }

    /// Number of states on the path.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// `true` if the path is a bare root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The score an evaluator attached, if any.
    #[inline(always)]
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Attaches an evaluator score.
    #[inline]
    pub fn set_score(&mut self, score: f64) {
        self.score = Some(score);
    }

    /// Returns the path extended by one step.
    pub fn extended(&self, action: A, state: S) -> Self
    where
        S: Clone,
        A: Clone,
    {
        let mut states = self.states.clone();
        let mut actions = self.actions.clone();
        states.push(state);
        actions.push(action);
        SearchPath {
            states,
            actions,
            score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SearchPath;

    #[test]
    fn test_root_path() {
        let path: SearchPath<u32, char> = SearchPath::root(5);
        assert_eq!(path.len(), 1);
        assert!(path.is_empty());
        assert_eq!(*path.head(), 5);
        assert_eq!(*path.tail(), 5);
    }

    #[test]
    fn test_extended_leaves_original_untouched() {
        let root: SearchPath<u32, char> = SearchPath::root(0);
        let longer = root.extended('a', 1).extended('b', 2);
        assert_eq!(root.len(), 1);
        assert_eq!(longer.states(), &[0, 1, 2]);
        assert_eq!(longer.actions(), &['a', 'b']);
        assert_eq!(*longer.head(), 2);
    }

    #[test]
    fn test_score_is_dropped_on_extension() {
        let mut path: SearchPath<u32, char> = SearchPath::root(0);
        path.set_score(1.5);
        assert_eq!(path.score(), Some(1.5));
        assert_eq!(path.extended('a', 1).score(), None);
    }

    #[test]
    #[should_panic(expected = "n - 1 actions")]
    fn test_mismatched_parts_panic() {
        let _ = SearchPath::new(vec![1, 2, 3], vec!['a']);
    }
}
