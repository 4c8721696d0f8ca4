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

//! # Explored Nodes
//!
//! One node per explored state, linked to its parent by arena index. What a
//! strategy needs to remember about a node differs per strategy, so the
//! annotation lives in a tagged [`NodeLabel`] instead of a grab bag of
//! optional fields.

use crate::arena::NodeId;
use smallvec::SmallVec;

/// Running reward statistics of a Monte-Carlo tree-search node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct McStats {
    /// Number of playouts that crossed this node.
    pub visits: u64,
    /// Sum of the rewards of those playouts.
    pub total_reward: f64,
}

impl McStats {
    /// Records one playout reward.
    #[inline]
    pub fn record(&mut self, reward: f64) {
        self.visits += 1;
        self.total_reward += reward;
    }

    /// The mean reward, or `0.0` before the first visit.
    #[inline]
    pub fn mean(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_reward / self.visits as f64
        }
    }
}

/// Strategy-specific annotation of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeLabel {
    /// No annotation.
    None,
    /// A scalar cost, as used by score-ordered strategies.
    Cost(f64),
    /// The indices of the preference-order deviations taken to reach this
    /// node, as used by discrepancy-bounded strategies.
    DiscrepancyPath(Vec<u32>),
    /// Monte-Carlo reward statistics.
    McStats(McStats),
}

impl NodeLabel {
    /// The scalar cost, if the label carries one.
    #[inline]
    pub fn cost(&self) -> Option<f64> {
        match self {
            NodeLabel::Cost(cost) => Some(*cost),
            _ => None,
        }
    }

    /// Mutable access to the Monte-Carlo statistics, if the label carries
    /// them.
    #[inline]
    pub fn mc_stats_mut(&mut self) -> Option<&mut McStats> {
        match self {
            NodeLabel::McStats(stats) => Some(stats),
            _ => None,
        }
    }
}

/// One explored node.
#[derive(Debug, Clone)]
pub struct Node<S, A> {
    /// The state this node stands for.
    pub state: S,
    /// Arena index of the parent, `None` for roots.
    pub parent: Option<NodeId>,
    /// The action that led here from the parent, `None` for roots.
    pub action: Option<A>,
    /// Strategy-specific annotation.
    pub label: NodeLabel,
    /// Whether the successors of this node have been generated.
    pub expanded: bool,
    /// Arena indices of the generated children, in generation order.
    pub children: SmallVec<[NodeId; 4]>,
}

impl<S, A> Node<S, A> {
    /// A root node.
    pub fn root(state: S) -> Self {
        Node {
            state,
            parent: None,
            action: None,
            label: NodeLabel::None,
            expanded: false,
            children: SmallVec::new(),
        }
    }

    /// A child node reached from `parent` via `action`.
    pub fn child(state: S, parent: NodeId, action: A) -> Self {
        Node {
            state,
            parent: Some(parent),
            action: Some(action),
            label: NodeLabel::None,
            expanded: false,
            children: SmallVec::new(),
        }
    }

    /// Sets the label, builder style.
    pub fn with_label(mut self, label: NodeLabel) -> Self {
        self.label = label;
        self
    }

    /// `true` for nodes without a parent.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
