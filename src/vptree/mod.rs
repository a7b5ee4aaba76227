//! Vantage-point tree.
//!
//! Sibling of the cover tree with the same query contract ([`MetricIndex`]),
//! but a different partitioning: each inner node picks a vantage point and
//! splits the remaining objects at the median distance to it into a near and a
//! far child. Each child remembers the `[low, high]` interval of distances to
//! the vantage point, so a query at distance `d` from the vantage point can
//! skip a child whose interval lies farther than `max(low - d, d - high)`.
//!
//! Vantage points are chosen by sampling: among `sample_size` random
//! candidates, the one whose distances to a second random sample spread the
//! most (largest variance) wins. Objects at distance 0 from the vantage point
//! stay in its node.
//!
//! # References
//!
//! - Yianilos (1993): "Data structures and algorithms for nearest neighbor
//!   search in general metric spaces"
//!
//! [`MetricIndex`]: crate::index::MetricIndex

mod construction;
mod priority;
mod search;

pub use priority::VpTreePriority;

use smallvec::SmallVec;
use tracing::debug;

use crate::distance::Metric;
use crate::error::{IndexError, Result};
use crate::index::TreeStats;

/// Vantage-point tree parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VpTreeParams {
    /// Nodes with at most this many objects become leaves. Must be at least 1.
    pub truncate: usize,

    /// Number of vantage point candidates (and of reference objects used to
    /// score them) sampled per node.
    /// Must be at least 1; 1 takes the first candidate without sampling.
    pub sample_size: usize,

    /// Seed for vantage point sampling; `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for VpTreeParams {
    fn default() -> Self {
        Self {
            truncate: 8,
            sample_size: 10,
            seed: None,
        }
    }
}

impl VpTreeParams {
    /// Set the leaf size.
    pub fn with_truncate(mut self, truncate: usize) -> Self {
        self.truncate = truncate;
        self
    }

    /// Set the vantage point sample size.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Configure a deterministic seed for vantage point sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.truncate < 1 {
            return Err(IndexError::invalid("truncate", "must be at least 1"));
        }
        if self.sample_size < 1 {
            return Err(IndexError::invalid("sample_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// Child reference with the distance interval of its objects to the parent's
/// vantage point.
#[derive(Clone, Copy, Debug)]
pub(crate) struct VpChild {
    pub(crate) node: u32,
    pub(crate) low: f64,
    pub(crate) high: f64,
}

impl VpChild {
    /// Lower bound for anything in the child, given the query's distance `d`
    /// to the parent's vantage point.
    #[inline]
    pub(crate) fn bound(&self, d: f64) -> f64 {
        (self.low - d).max(d - self.high).max(0.0)
    }
}

/// Vantage-point tree node.
#[derive(Clone, Debug)]
pub(crate) struct VpNode {
    /// Vantage point first, then the other objects stored in this node.
    pub(crate) singletons: SmallVec<[u32; 4]>,
    /// Distance of each singleton to the vantage point.
    pub(crate) dists: SmallVec<[f64; 4]>,
    pub(crate) children: SmallVec<[VpChild; 2]>,
}

impl VpNode {
    #[inline]
    pub(crate) fn vantage(&self) -> u32 {
        self.singletons[0]
    }
}

/// Vantage-point tree over a borrowed relation.
#[derive(Debug)]
pub struct VpTree<'a, O, M> {
    data: &'a [O],
    metric: M,
    params: VpTreeParams,
    nodes: Vec<VpNode>,
    root: Option<u32>,
    built: bool,
    len: usize,
}

impl<'a, O, M: Metric<O>> VpTree<'a, O, M> {
    /// Create an unbuilt tree. Parameters are validated here.
    pub fn new(data: &'a [O], metric: M, params: VpTreeParams) -> Result<Self> {
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
        let ids: Vec<u32> = (0..self.data.len() as u32).collect();
        self.bulk_load(&ids)
    }

    /// Bulk-load the given identifiers. An empty slice yields an empty index.
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

        if !ids.is_empty() {
            let builder = construction::VpBuilder::new(self.data, &self.metric, &self.params);
            let (nodes, root) = builder.load(ids);
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
            "vp-tree built"
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
    pub fn params(&self) -> &VpTreeParams {
        &self.params
    }

    /// Node count, depth and occupancy diagnostics.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut stack: Vec<(u32, usize)> = self.root.map(|r| (r, 0)).into_iter().collect();
        while let Some((idx, depth)) = stack.pop() {
            let node = &self.nodes[idx as usize];
            stats.visit(depth, node.singletons.len(), 0);
            stack.extend(node.children.iter().map(|c| (c.node, depth + 1)));
        }
        stats.finish()
    }

    fn root_checked(&self) -> Result<Option<u32>> {
        if !self.built {
            return Err(IndexError::NotBuilt);
        }
        Ok(self.root)
    }
}
