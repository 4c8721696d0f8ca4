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

//! # Discrepancy-Ordered Relation Enumeration
//!
//! ## Motivation
//!
//! Enumerating a Cartesian product over ranked domains in the obvious
//! nested-loop order exhausts the last domain before advancing the first,
//! which is the opposite of what a preference-aware consumer wants. This
//! enumerator instead orders tuples by their *deficiency*: the sum of the
//! rank positions of the chosen values. Tuples made of first choices come
//! first, then every tuple that strays once, and so on.
//!
//! Ties on deficiency break lexicographically on the list of positions
//! where the tuple deviates (earlier deviations first), then by insertion
//! order. For the domains `{a, b} x {1, 2, 3}` this yields
//! `(a,1), (b,1), (a,2), (b,2), (a,3), (b,3)`.
//!
//! Partial tuples never sort before their prefix, so a priority queue over
//! partial assignments pops completed tuples in the global order while the
//! product is still being unfolded. Buffers of spent queue entries are
//! recycled, so a long enumeration settles into a steady allocation
//! footprint.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Filters partial assignments; a rejected prefix prunes every tuple
/// extending it.
pub type PrefixFilter<V> = Box<dyn Fn(&[V]) -> bool + Send>;

struct Entry<V> {
    /// Sum of the rank positions chosen so far.
    deficiency: u32,
    /// Positions of the deviations, with multiplicity, in ascending order.
    deviations: Vec<u32>,
    seq: u64,
    prefix: Vec<V>,
}

impl<V> Entry<V> {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.deficiency
            .cmp(&other.deficiency)
            .then_with(|| self.deviations.cmp(&other.deviations))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl<V> PartialEq for Entry<V> {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl<V> Eq for Entry<V> {}

impl<V> PartialOrd for Entry<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.key_cmp(other))
    }
}

impl<V> Ord for Entry<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_cmp(other)
    }
}

/// Enumerates the Cartesian product of ranked domains in deficiency order.
///
/// Implements [`Iterator`]; each call to `next` does a bounded amount of
/// unfolding and yields the next tuple of the total order, so the consumer
/// may stop at any point.
pub struct CartesianEnumerator<V> {
    domains: Vec<Vec<V>>,
    queue: BinaryHeap<Reverse<Entry<V>>>,
    filter: Option<PrefixFilter<V>>,
    next_seq: u64,
    /// Spent entry buffers, reused for new queue entries.
    spare: Vec<(Vec<V>, Vec<u32>)>,
}

impl<V: Clone> CartesianEnumerator<V> {
    /// An enumerator over `domains`, each given most-preferred first.
    pub fn new(domains: Vec<Vec<V>>) -> Self {
        let mut queue = BinaryHeap::new();
        queue.push(Reverse(Entry {
            deficiency: 0,
            deviations: Vec::new(),
            seq: 0,
            prefix: Vec::new(),
        }));
        CartesianEnumerator {
            domains,
            queue,
            filter: None,
            next_seq: 1,
            spare: Vec::new(),
        }
    }

    /// Installs a prefix filter. Rejected prefixes prune their whole
    /// subtree before any of its tuples is materialized.
    pub fn with_prefix_filter(mut self, filter: impl Fn(&[V]) -> bool + Send + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Number of domains, i.e. the width of every yielded tuple.
    #[inline]
    pub fn arity(&self) -> usize {
        self.domains.len()
    }

    fn expand(&mut self, entry: Entry<V>) {
        let depth = entry.prefix.len();
        for (rank, value) in self.domains[depth].iter().enumerate() {
            let (mut prefix, mut deviations) = match self.spare.pop() {
                Some((mut p, mut d)) => {
                    p.clear();
                    d.clear();
                    (p, d)
                }
                None => (Vec::new(), Vec::new()),
            };
            prefix.extend(entry.prefix.iter().cloned());
            prefix.push(value.clone());
            if let Some(filter) = &self.filter {
                if !filter(&prefix) {
                    deviations.clear();
                    self.spare.push((prefix, deviations));
                    continue;
                }
            }
            deviations.extend(entry.deviations.iter().copied());
            for _ in 0..rank {
                deviations.push(depth as u32);
            }
            let seq = self.next_seq;
            self.next_seq += 1;
            self.queue.push(Reverse(Entry {
                deficiency: entry.deficiency + rank as u32,
                deviations,
                seq,
                prefix,
            }));
        }
        self.spare.push((entry.prefix, entry.deviations));
    }
}

impl<V: Clone> Iterator for CartesianEnumerator<V> {
    type Item = Vec<V>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Reverse(entry)) = self.queue.pop() {
            if entry.prefix.len() == self.domains.len() {
                self.spare.push((Vec::new(), entry.deviations));
                return Some(entry.prefix);
            }
            self.expand(entry);
        }
        None
    }
}

impl<V> std::fmt::Debug for CartesianEnumerator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartesianEnumerator")
            .field("arity", &self.domains.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_by_three_reference_order() {
        let tuples: Vec<Vec<char>> = CartesianEnumerator::new(vec![
            vec!['a', 'b'],
            vec!['1', '2', '3'],
        ])
        .collect();
        assert_eq!(
            tuples,
            vec![
                vec!['a', '1'],
                vec!['b', '1'],
                vec!['a', '2'],
                vec!['b', '2'],
                vec!['a', '3'],
                vec!['b', '3'],
            ]
        );
    }

    #[test]
    fn test_deficiency_never_decreases() {
        let domains: Vec<Vec<u32>> = vec![vec![0, 1, 2], vec![0, 1, 2], vec![0, 1]];
        // Domain values equal their rank, so a tuple's deficiency is its sum.
        let deficiencies: Vec<u32> = CartesianEnumerator::new(domains)
            .map(|tuple| tuple.iter().sum())
            .collect();
        assert_eq!(deficiencies.len(), 18);
        for pair in deficiencies.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_earlier_deviations_break_deficiency_ties() {
        let tuples: Vec<Vec<u32>> =
            CartesianEnumerator::new(vec![vec![0, 1], vec![0, 1]]).collect();
        // Both one-deviation tuples have deficiency 1; the one deviating in
        // the first position comes first.
        assert_eq!(
            tuples,
            vec![vec![0, 0], vec![1, 0], vec![0, 1], vec![1, 1]]
        );
    }

    #[test]
    fn test_prefix_filter_prunes_subtrees() {
        let tuples: Vec<Vec<u32>> =
            CartesianEnumerator::new(vec![vec![0, 1], vec![0, 1], vec![0, 1]])
                .with_prefix_filter(|prefix: &[u32]| prefix.first() != Some(&1))
                .collect();
        assert_eq!(tuples.len(), 4);
        assert!(tuples.iter().all(|tuple| tuple[0] == 0));
    }

    #[test]
    fn test_empty_domain_yields_nothing() {
        let tuples: Vec<Vec<u32>> =
            CartesianEnumerator::new(vec![vec![1, 2], Vec::new()]).collect();
        assert!(tuples.is_empty());
    }

    #[test]
    fn test_zero_arity_yields_one_empty_tuple() {
        let tuples: Vec<Vec<u32>> = CartesianEnumerator::new(Vec::new()).collect();
        assert_eq!(tuples, vec![Vec::<u32>::new()]);
    }

    #[test]
    fn test_enumeration_is_resumable() {
        let mut enumerator =
            CartesianEnumerator::new(vec![vec!['a', 'b'], vec!['1', '2', '3']]);
        assert_eq!(enumerator.next(), Some(vec!['a', '1']));
        assert_eq!(enumerator.next(), Some(vec!['b', '1']));
        // Picking up later continues the same total order.
        let rest: Vec<Vec<char>> = enumerator.collect();
        assert_eq!(rest.len(), 4);
        assert_eq!(rest[0], vec!['a', '2']);
    }
}
