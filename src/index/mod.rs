//! Query contract shared by all metric indexes.
//!
//! - [`MetricIndex`]: range, k-NN and priority search, plus diagnostics
//! - [`PrioritySearch`]: the incremental cursor surface
//! - [`Query`]: query-kind tag (external object or relation identifier)
//! - [`CandidateDistance`]: the injected "distance to candidate" capability
//!
//! The open node set and the bounded top-k heap live here too, so the cover
//! tree and the vantage-point tree share one implementation of the best-first
//! bookkeeping.

pub(crate) mod heap;
pub mod query;
pub mod traits;

pub use query::{CandidateDistance, Query, QueryDistance};
pub use traits::{MetricIndex, PrioritySearch, TreeStats};
