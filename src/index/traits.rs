//! Unified query contract for all metric indexes.

use super::heap::KnnHeap;
use super::query::Query;
use crate::error::Result;

/// Unified trait for exact metric indexes.
///
/// Every implementation answers the same three query kinds with identical
/// results (up to the unspecified order of range results); they differ only in
/// how they partition the data and therefore in how many distances they compute.
pub trait MetricIndex<O> {
    /// Cursor type returned by [`MetricIndex::priority`].
    type Searcher<'s>: PrioritySearch
    where
        Self: 's,
        O: 's;

    /// All objects within `radius` of the query, with their distances.
    fn range(&self, query: Query<'_, O>, radius: f64) -> Result<Vec<(u32, f64)>>;

    /// The `min(k, n)` nearest objects, ascending by distance, ties by id.
    fn knn(&self, query: Query<'_, O>, k: usize) -> Result<Vec<(u32, f64)>>;

    /// Incremental best-first cursor over all objects.
    fn priority<'s>(&'s self, query: Query<'s, O>) -> Result<Self::Searcher<'s>>;

    /// Shape diagnostics of the built tree.
    fn stats(&self) -> TreeStats;

    /// Number of indexed objects.
    fn len(&self) -> usize;

    /// Whether the index holds no objects.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Incremental priority search cursor.
///
/// Yields candidates one at a time in approximately increasing distance. Each
/// candidate carries cheap bounds on its distance; the exact distance is only
/// computed on demand. The cutoff may be lowered at any time, which prunes
/// subtrees that cannot contain anything closer. Dropping the cursor ends the
/// search.
pub trait PrioritySearch {
    /// Whether the cursor currently points at a candidate.
    fn valid(&self) -> bool;

    /// Move to the next candidate.
    fn advance(&mut self);

    /// Lower the cutoff. Thresholds only decrease; larger values are ignored.
    fn decrease_cutoff(&mut self, threshold: f64);

    /// Identifier of the current candidate.
    fn id(&self) -> Option<u32>;

    /// Distance from the query to the routing object the candidate was found under.
    fn approximate_distance(&self) -> f64;

    /// Maximum error of [`PrioritySearch::approximate_distance`] for this candidate
    /// (0 for the routing object itself).
    fn approximate_accuracy(&self) -> f64;

    /// Lower bound on the current candidate's distance.
    fn lower_bound(&self) -> f64;

    /// Upper bound on the current candidate's distance.
    fn upper_bound(&self) -> f64;

    /// Exact distance of the current candidate (may compute a distance).
    fn compute_exact_distance(&self) -> f64;

    /// Lower bound on the distance of every candidate not yet yielded.
    ///
    /// Non-decreasing over the lifetime of the cursor.
    fn all_lower_bound(&self) -> f64;

    /// Dynamic top-k: consume the cursor, shrinking the cutoff to the current
    /// k-th distance as candidates arrive.
    ///
    /// Returns the same list as k-NN search: ascending by distance, ties by id.
    fn nearest(&mut self, k: usize) -> Vec<(u32, f64)>
    where
        Self: Sized,
    {
        if k == 0 {
            return Vec::new();
        }
        let mut heap = KnnHeap::new(k);
        let mut d_k = f64::INFINITY;
        while let Some(id) = self.id() {
            if self.lower_bound() <= d_k {
                let d = self.compute_exact_distance();
                if d <= d_k {
                    d_k = heap.insert(d, id);
                    if heap.is_full() {
                        self.decrease_cutoff(d_k);
                    }
                }
            }
            self.advance();
        }
        heap.into_sorted_vec()
    }
}

/// Tree shape diagnostics. Observational only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeStats {
    /// Number of nodes.
    pub nodes: usize,
    /// Mean node depth (root = 0).
    pub avg_depth: f64,
    /// Deepest node.
    pub max_depth: usize,
    /// Entries besides the routing object, summed over nodes.
    pub singletons: usize,
    /// Identifiers stored in the tree; equals the number of loaded objects.
    pub entries: usize,
}

impl TreeStats {
    /// Account for one node at `depth` holding `stored` identifiers, of which
    /// `routed` (0 or 1) is represented by a child subtree instead.
    pub(crate) fn visit(&mut self, depth: usize, stored: usize, routed: usize) {
        self.nodes += 1;
        // Summed here, divided in `finish`.
        self.avg_depth += depth as f64;
        self.max_depth = self.max_depth.max(depth);
        self.singletons += stored.saturating_sub(1);
        self.entries += stored - routed;
    }

    pub(crate) fn finish(mut self) -> Self {
        if self.nodes > 0 {
            self.avg_depth /= self.nodes as f64;
        }
        self
    }
}
