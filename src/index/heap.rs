//! Heaps shared by the best-first searches.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A node waiting to be expanded.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OpenNode {
    /// Lower bound on the distance from the query to anything in the subtree.
    pub(crate) bound: f64,
    /// Exact distance from the query to the node's routing object, when the
    /// search computed it before queueing (`NaN` otherwise).
    pub(crate) dist: f64,
    /// Arena index of the node.
    pub(crate) node: u32,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on the bound; total_cmp keeps NaN from corrupting the heap.
        self.bound
            .total_cmp(&other.bound)
            .then_with(|| self.node.cmp(&other.node))
            .reverse()
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Open node set: min-priority queue of subtrees keyed by lower bound.
///
/// Both k-NN search and priority search drain it in bound order. Once the
/// smallest bound exceeds the caller's cutoff, nothing left can qualify.
#[derive(Debug, Default)]
pub(crate) struct OpenSet {
    heap: BinaryHeap<OpenNode>,
}

impl OpenSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, bound: f64, dist: f64, node: u32) {
        self.heap.push(OpenNode { bound, dist, node });
    }

    pub(crate) fn peek_bound(&self) -> Option<f64> {
        self.heap.peek().map(|open| open.bound)
    }

    pub(crate) fn pop(&mut self) -> Option<OpenNode> {
        self.heap.pop()
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }
}

/// A result candidate, ordered by `(distance, id)`.
#[derive(Clone, Copy, Debug)]
struct Scored {
    dist: f64,
    id: u32,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded top-k collector.
///
/// Keeps the `k` smallest `(distance, id)` pairs; among equal distances the
/// smaller identifiers win.
#[derive(Debug)]
pub(crate) struct KnnHeap {
    k: usize,
    // Max-heap: the current k-th best sits on top.
    heap: BinaryHeap<Scored>,
}

impl KnnHeap {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// The k-th smallest distance seen so far, or infinity until `k` are known.
    pub(crate) fn kth_distance(&self) -> f64 {
        if self.is_full() {
            self.heap.peek().map_or(f64::INFINITY, |s| s.dist)
        } else {
            f64::INFINITY
        }
    }

    /// Offer a candidate; returns the (possibly tightened) k-th distance.
    pub(crate) fn insert(&mut self, dist: f64, id: u32) -> f64 {
        if self.k == 0 {
            return f64::INFINITY;
        }
        let cand = Scored { dist, id };
        if !self.is_full() {
            self.heap.push(cand);
        } else if let Some(mut worst) = self.heap.peek_mut() {
            if cand < *worst {
                *worst = cand;
            }
        }
        self.kth_distance()
    }

    /// Results sorted ascending by `(distance, id)`.
    pub(crate) fn into_sorted_vec(self) -> Vec<(u32, f64)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|s| (s.id, s.dist))
            .collect()
    }
}
