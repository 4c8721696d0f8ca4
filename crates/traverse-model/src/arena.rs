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

//! # Node Arena
//!
//! ## Motivation
//!
//! Search trees are linked structures, and linked structures with owning
//! pointers fight the borrow checker. The arena sidesteps that: nodes live
//! in one `Vec`, links are plain indices, and a released slot goes onto a
//! free list so enumeration strategies that burn through millions of
//! short-lived leaves reuse storage instead of growing without bound.
//!
//! A [`NodeId`] is only valid for the arena that issued it and only until
//! the node is released. Indexing a vacant slot panics.

use crate::node::Node;
use crate::path::SearchPath;

/// Index of a node within its [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Wraps a raw index.
    #[inline(always)]
    pub fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// The raw index.
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug)]
enum Slot<S, A> {
    Occupied(Node<S, A>),
    Vacant { next_free: Option<usize> },
}

/// Index-based node storage with slot recycling.
#[derive(Debug)]
pub struct NodeArena<S, A> {
    slots: Vec<Slot<S, A>>,
    free_head: Option<usize>,
    live: usize,
    reused: u64,
}

impl<S, A> NodeArena<S, A> {
    /// An empty arena.
    pub fn new() -> Self {
        NodeArena {
            slots: Vec::new(),
            free_head: None,
            live: 0,
            reused: 0,
        }
    }

    /// An empty arena with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        NodeArena {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            live: 0,
            reused: 0,
        }
    }

    /// Stores `node`, reusing a released slot if one is available.
    pub fn insert(&mut self, node: Node<S, A>) -> NodeId {
        self.live += 1;
        match self.free_head {
            Some(index) => {
                let next_free = match self.slots[index] {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => unreachable!("free list points at an occupied slot"),
                };
                self.free_head = next_free;
                self.slots[index] = Slot::Occupied(node);
                self.reused += 1;
                NodeId(index)
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Removes the node at `id` and puts its slot on the free list,
    /// returning the node. The caller must make sure no other node still
    /// links to `id`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is vacant.
    pub fn release(&mut self, id: NodeId) -> Node<S, A> {
        let slot = std::mem::replace(
            &mut self.slots[id.index()],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        match slot {
            Slot::Occupied(node) => {
                self.free_head = Some(id.index());
                self.live -= 1;
                node
            }
            Slot::Vacant { .. } => panic!("released a vacant slot: {id}"),
        }
    }

    /// The node at `id`, or `None` if the slot is vacant or out of range.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node<S, A>> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    /// Mutable access to the node at `id`.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<S, A>> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    /// Number of live nodes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.live
    }

    /// `true` if no node is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated, live or vacant.
    #[inline]
    pub fn capacity_used(&self) -> usize {
        self.slots.len()
    }

    /// How many insertions reused a released slot.
    #[inline]
    pub fn reused_slots(&self) -> u64 {
        self.reused
    }

    /// Registers `child` as a child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is vacant.
    pub fn link_child(&mut self, parent: NodeId, child: NodeId) {
        self[parent].children.push(child);
    }

    /// Reconstructs the root-to-node path ending at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` or any of its ancestors is vacant.
    pub fn path_to(&self, id: NodeId) -> SearchPath<S, A>
    where
        S: Clone,
        A: Clone,
    {
        let mut states = Vec::new();
        let mut actions = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self[current];
            states.push(node.state.clone());
            if let Some(action) = &node.action {
                actions.push(action.clone());
            }
            cursor = node.parent;
        }
        states.reverse();
        actions.reverse();
        SearchPath::new(states, actions)
    }
}

impl<S, A> Default for NodeArena<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> std::ops::Index<NodeId> for NodeArena<S, A> {
    type Output = Node<S, A>;

    #[inline]
    fn index(&self, id: NodeId) -> &Self::Output {
        match &self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("indexed a vacant slot: {id}"),
        }
    }
}

impl<S, A> std::ops::IndexMut<NodeId> for NodeArena<S, A> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match &mut self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("indexed a vacant slot: {id}"),
        }
    }
}
