//! metric-index: exact similarity search in arbitrary metric spaces.
//!
//! Indexes are built once over a borrowed relation (a slice of objects whose
//! position is the object's identifier) and a distance function that satisfies
//! the triangle inequality. Nothing is assumed about the objects themselves,
//! so the same trees serve vectors, strings, sets or anything else with a
//! metric.
//!
//! - `covertree/`: simplified cover tree (Beygelzimer, Kakade, Langford 2006)
//! - `vptree/`: vantage-point tree (Yianilos 1993), behind the `vptree` feature
//! - `index/`: the shared query contract ([`MetricIndex`], [`PrioritySearch`])
//! - `distance/`: the [`Metric`] trait and stock metrics for `f32` vectors
//!
//! Every index answers three query kinds with exact results:
//!
//! - **range**: all objects within a radius
//! - **k-NN**: the k nearest objects, ascending by distance, ties by id
//! - **priority**: an incremental cursor yielding candidates in roughly
//!   increasing distance, with cheap per-candidate bounds and a cutoff that
//!   can be lowered while iterating
//!
//! ```
//! use metric_index::{CoverTree, CoverTreeParams, DistanceMetric};
//!
//! let points = vec![
//!     vec![0.0f32, 0.0],
//!     vec![1.0, 0.0],
//!     vec![0.0, 5.0],
//!     vec![4.0, 4.0],
//! ];
//! let mut tree = CoverTree::new(&points, DistanceMetric::L2, CoverTreeParams::default())?;
//! tree.build()?;
//!
//! let nearest = tree.knn_by_object(&vec![0.9, 0.1], 2)?;
//! assert_eq!(nearest[0].0, 1);
//! assert_eq!(nearest[1].0, 0);
//! # Ok::<(), metric_index::IndexError>(())
//! ```
//!
//! # When a metric tree pays off
//!
//! Pruning relies on the triangle inequality, so it works as well as the data's
//! intrinsic dimensionality allows. For high intrinsic dimensionality, almost
//! every pairwise distance is close to the median and bounds rarely exclude a
//! subtree; a linear scan is then just as fast.

pub mod covertree;
pub mod distance;
pub mod error;
pub mod index;

#[cfg(feature = "vptree")]
pub mod vptree;

pub use covertree::{CoverTree, CoverTreeParams, CoverTreePriority};
pub use distance::{AbsoluteDifference, DistanceMetric, Metric};
pub use error::{IndexError, Result};
pub use index::{CandidateDistance, MetricIndex, PrioritySearch, Query, QueryDistance, TreeStats};

#[cfg(feature = "vptree")]
pub use vptree::{VpTree, VpTreeParams, VpTreePriority};
