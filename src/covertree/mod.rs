//! Simplified cover tree (in-memory, bulk-loaded, immutable).
//!
//! A multi-resolution metric tree: every node owns a ball around its routing
//! object whose radius shrinks geometrically (`expansion^scale`) from level to
//! level. Only the distance function is required, and it must be a metric.
//!
//! # Structure
//!
//! Each node stores
//! - an ordered list of identifiers whose first entry is the **routing object**,
//!   followed by singletons that live directly in this node,
//! - `max_dist`: the exact maximum distance from the routing object to anything
//!   stored below the node (computed once during construction),
//! - child nodes (none for a leaf).
//!
//! In an inner node the routing object is represented by a child subtree (or,
//! if it had no own cover, re-appended as a plain singleton), so searches skip
//! entry 0 of inner nodes.
//!
//! Unlike the cover tree of Beygelzimer et al., the distance to the parent is not stored.
//! That saves memory but costs extra distance computations during search.
//!
//! # Construction
//!
//! Bulk loading is the only way in: the tree is built once from a fixed set of
//! identifiers and is read-only afterwards. There is no insert or delete. The
//! loader does a single forward pass over the "far" candidates and never looks
//! back into already-partitioned ones, which is simpler than the reference
//! algorithm and occasionally less balanced.
//!
//! # Usage
//!
//! ```rust
//! use metric_index::covertree::{CoverTree, CoverTreeParams};
//! use metric_index::distance::AbsoluteDifference;
//!
//! # fn main() -> Result<(), metric_index::IndexError> {
//! let data = vec![0.0, 1.0, 3.0, 6.0];
//! let mut tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::new(2.0, 1))?;
//! tree.build()?;
//!
//! let nearest = tree.knn_by_id(2, 2)?;
//! assert_eq!(nearest, vec![(2, 0.0), (1, 2.0)]);
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - Beygelzimer, Kakade, Langford (2006): "Cover trees for nearest neighbor"

mod construction;
mod priority;
mod search;

pub use priority::CoverTreePriority;

use smallvec::SmallVec;
use tracing::debug;

use crate::distance::Metric;
use crate::error::{IndexError, Result};
use crate::index::TreeStats;

/// Cover tree parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoverTreeParams {
    /// Expansion rate: the ratio between the cover radii of consecutive levels.
    ///
    /// Must exceed 1. Small values give deep, narrow trees; large values give
    /// shallow, wide ones.
    pub expansion: f64,

    /// Subtrees with fewer than this many candidates become leaves.
    ///
    /// Must be at least 1.
    pub truncate: usize,
}

impl Default for CoverTreeParams {
    fn default() -> Self {
        Self {
            expansion: 1.3,
            truncate: 10,
        }
    }
}

impl CoverTreeParams {
    /// Parameters with the given expansion rate and truncation size.
    pub fn new(expansion: f64, truncate: usize) -> Self {
        Self {
            expansion,
            truncate,
        }
    }

    /// Set the expansion rate.
    pub fn with_expansion(mut self, expansion: f64) -> Self {
        self.expansion = expansion;
        self
    }

    /// Set the truncation size.
    pub fn with_truncate(mut self, truncate: usize) -> Self {
        self.truncate = truncate;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.expansion > 1.0 && self.expansion.is_finite()) {
            return Err(IndexError::invalid(
                "expansion",
                format!("must be a finite value greater than 1, got {}", self.expansion),
            ));
        }
        if self.truncate < 1 {
            return Err(IndexError::invalid("truncate", "must be at least 1"));
        }
        Ok(())
    }
}

/// Cover tree node.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    /// Routing object first, then the singletons of this node.
    pub(crate) singletons: SmallVec<[u32; 4]>,
    /// Maximum distance from the routing object to any descendant.
    pub(crate) max_dist: f64,
    /// Arena indices of the child nodes; empty for a leaf.
    pub(crate) children: SmallVec<[u32; 4]>,
}

impl Node {
    #[inline]
    pub(crate) fn routing(&self) -> u32 {
        self.singletons[0]
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Simplified cover tree over a borrowed relation.
///
/// Identifier `i` names `data[i]`. Build once with [`CoverTree::build`] or
/// [`CoverTree::bulk_load`], then query from as many threads as you like.
#[derive(Debug)]
pub struct CoverTree<'a, O, M> {
    data: &'a [O],
    metric: M,
    params: CoverTreeParams,
    nodes: Vec<Node>,
    root: Option<u32>,
    built: bool,
    len: usize,
}

impl<'a, O, M: Metric<O>> CoverTree<'a, O, M> {
    /// Create an unbuilt cover tree. Parameters are validated here, before any
    /// distance is computed.
    pub fn new(data: &'a [O], metric: M, params: CoverTreeParams) -> Result<Self> {
        params.validate()?;
        if u32::try_from(data.len()).is_err() {
            return Err(IndexError::invalid(
                "data",
                format!("at most {} objects can be indexed", u32::MAX),
            ));
        }
        Ok(Self {
            data,
            metric,
            params,
            nodes: Vec::new(),
            root: None,
            built: false,
            len: 0,
        })
    }

    /// Bulk-load every object of the relation.
    pub fn build(&mut self) -> Result<()> {
        // Fits: checked in `new`.
        let ids: Vec<u32> = (0..self.data.len() as u32).collect();
        self.bulk_load(&ids)
    }

    /// Bulk-load the given identifiers. The first one becomes the root's routing
    /// object.
    ///
    /// An empty slice yields a valid, empty index.
    pub fn bulk_load(&mut self, ids: &[u32]) -> Result<()> {
        if self.built {
            return Err(IndexError::AlreadyBuilt);
        }
        if let Some(&id) = ids.iter().find(|&&id| id as usize >= self.data.len()) {
            return Err(IndexError::UnknownId {
                id,
                len: self.data.len(),
            });
        }

        if let Some((&first, rest)) = ids.split_first() {
            let loader = construction::BulkLoader::new(self.data, &self.metric, &self.params);
            let (nodes, root) = loader.load(first, rest);
            self.nodes = nodes;
            self.root = Some(root);
        }
        self.len = ids.len();
        self.built = true;

        let stats = self.stats();
        debug!(
            nodes = stats.nodes,
            avg_depth = stats.avg_depth,
            max_depth = stats.max_depth,
            singletons = stats.singletons,
            entries = stats.entries,
            "cover tree built"
        );
        Ok(())
    }

    /// Whether the tree has been built.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no objects are indexed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The construction parameters.
    pub fn params(&self) -> &CoverTreeParams {
        &self.params
    }

    /// The indexed relation.
    pub fn data(&self) -> &'a [O] {
        self.data
    }

    /// Node count, depth and occupancy diagnostics.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut stack: Vec<(u32, usize)> = self.root.map(|r| (r, 0)).into_iter().collect();
        while let Some((idx, depth)) = stack.pop() {
            let node = &self.nodes[idx as usize];
            let routed = usize::from(!node.is_leaf());
            stats.visit(depth, node.singletons.len(), routed);
            stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
        }
        stats.finish()
    }

    /// Root of a built tree; `None` when the tree is empty.
    fn root_checked(&self) -> Result<Option<u32>> {
        if !self.built {
            return Err(IndexError::NotBuilt);
        }
        Ok(self.root)
    }
}
