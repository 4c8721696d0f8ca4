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

//! # Open List
//!
//! The frontier of a score-ordered search. A binary heap over `(score,
//! insertion sequence)` pairs; the caller supplies the score ordering, so
//! the same list serves minimizing and maximizing searches. Equal scores
//! pop in insertion order, which keeps runs deterministic.

use std::cmp::Ordering;
use traverse_model::NodeId;

/// Compares two scores; `Ordering::Less` means the first pops earlier.
pub type ScoreOrdering = Box<dyn Fn(f64, f64) -> Ordering + Send>;

#[derive(Debug, Clone, Copy)]
struct Entry {
    score: f64,
    seq: u64,
    id: NodeId,
}

/// A frontier ordered by a caller-supplied score comparison.
pub struct OpenList {
    heap: Vec<Entry>,
    ordering: ScoreOrdering,
    next_seq: u64,
}

impl OpenList {
    /// An open list popping the numerically smallest score first.
    pub fn minimizing() -> Self {
        Self::with_ordering(Box::new(|a, b| a.total_cmp(&b)))
    }

    /// An open list popping the numerically largest score first.
    pub fn maximizing() -> Self {
        Self::with_ordering(Box::new(|a, b| b.total_cmp(&a)))
    }

    /// An open list with a custom score ordering.
    pub fn with_ordering(ordering: ScoreOrdering) -> Self {
        OpenList {
            heap: Vec::new(),
            ordering,
            next_seq: 0,
        }
    }

    /// Number of queued entries.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// `true` if nothing is queued.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Queues `id` with `score`.
    pub fn push(&mut self, id: NodeId, score: f64) {
        let entry = Entry {
            score,
            seq: self.next_seq,
            id,
        };
        self.next_seq += 1;
        self.heap.push(entry);
        self.sift_up(self.heap.len() - 1);
    }

    /// Removes and returns the best entry.
    pub fn pop(&mut self) -> Option<(NodeId, f64)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let entry = self.heap.pop().unwrap();
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((entry.id, entry.score))
    }

    /// The best entry without removing it.
    pub fn peek(&self) -> Option<(NodeId, f64)> {
        self.heap.first().map(|entry| (entry.id, entry.score))
    }

    /// Drops every queued entry.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    fn before(&self, a: &Entry, b: &Entry) -> bool {
        match (self.ordering)(a.score, b.score) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => a.seq < b.seq,
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.before(&self.heap[index], &self.heap[parent]) {
                self.heap.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = index * 2 + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let mut best = left;
            if right < self.heap.len() && self.before(&self.heap[right], &self.heap[left]) {
                best = right;
            }
            if self.before(&self.heap[best], &self.heap[index]) {
                self.heap.swap(index, best);
                index = best;
            } else {
                break;
            }
        }
    }
}

impl std::fmt::Debug for OpenList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenList")
            .field("len", &self.heap.len())
            .finish()
    }
}
