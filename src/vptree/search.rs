//! Vantage-point tree range and k-NN search.
//!
//! A child is skipped when the query's distance `d` to the parent's vantage
//! point lies farther than the pruning radius outside the child's interval.
//! Singletons stored with their distance `a` to the vantage point are skipped
//! without evaluation when `|d - a|` already exceeds the radius.

use super::{VpNode, VpTree, VpTreePriority};
use crate::distance::Metric;
use crate::error::Result;
use crate::index::heap::{KnnHeap, OpenNode, OpenSet};
use crate::index::{CandidateDistance, MetricIndex, Query, QueryDistance, TreeStats};

impl<'a, O, M: Metric<O>> VpTree<'a, O, M> {
    /// All objects within `radius` of the query, with their distances.
    ///
    /// Result order is unspecified.
    pub fn range(&self, query: Query<'_, O>, radius: f64) -> Result<Vec<(u32, f64)>> {
        let root = self.root_checked()?;
        let dist = QueryDistance::new(query, self.data, &self.metric)?;
        Ok(root.map_or_else(Vec::new, |root| self.range_from(root, &dist, radius)))
    }

    /// Range search around an external object.
    pub fn range_by_object(&self, query: &O, radius: f64) -> Result<Vec<(u32, f64)>> {
        self.range(Query::Object(query), radius)
    }

    /// Range search around an indexed object.
    pub fn range_by_id(&self, id: u32, radius: f64) -> Result<Vec<(u32, f64)>> {
        self.range(Query::Id(id), radius)
    }

    /// Range search with a caller-supplied distance-to-candidate capability.
    pub fn range_with<D: CandidateDistance>(&self, dist: &D, radius: f64) -> Result<Vec<(u32, f64)>> {
        let root = self.root_checked()?;
        Ok(root.map_or_else(Vec::new, |root| self.range_from(root, dist, radius)))
    }

    /// The `min(k, n)` nearest objects, ascending by distance, ties by id.
    pub fn knn(&self, query: Query<'_, O>, k: usize) -> Result<Vec<(u32, f64)>> {
        let root = self.root_checked()?;
        let dist = QueryDistance::new(query, self.data, &self.metric)?;
        Ok(match root {
            Some(root) if k > 0 => self.knn_from(root, &dist, k),
            _ => Vec::new(),
        })
    }

    /// k-NN search around an external object.
    pub fn knn_by_object(&self, query: &O, k: usize) -> Result<Vec<(u32, f64)>> {
        self.knn(Query::Object(query), k)
    }

    /// k-NN search around an indexed object (which is its own nearest neighbor).
    pub fn knn_by_id(&self, id: u32, k: usize) -> Result<Vec<(u32, f64)>> {
        self.knn(Query::Id(id), k)
    }

    /// k-NN search with a caller-supplied distance-to-candidate capability.
    pub fn knn_with<D: CandidateDistance>(&self, dist: &D, k: usize) -> Result<Vec<(u32, f64)>> {
        let root = self.root_checked()?;
        Ok(match root {
            Some(root) if k > 0 => self.knn_from(root, dist, k),
            _ => Vec::new(),
        })
    }

    /// Incremental priority search from the query.
    ///
    /// The cursor starts positioned on the first candidate.
    pub fn priority<'s>(
        &'s self,
        query: Query<'s, O>,
    ) -> Result<VpTreePriority<'s, QueryDistance<'s, O, M>>> {
        let root = self.root_checked()?;
        let dist = QueryDistance::new(query, self.data, &self.metric)?;
        Ok(VpTreePriority::new(&self.nodes, root, dist))
    }

    /// Priority search around an external object.
    pub fn priority_by_object<'s>(
        &'s self,
        query: &'s O,
    ) -> Result<VpTreePriority<'s, QueryDistance<'s, O, M>>> {
        self.priority(Query::Object(query))
    }

    /// Priority search around an indexed object.
    pub fn priority_by_id(&self, id: u32) -> Result<VpTreePriority<'_, QueryDistance<'_, O, M>>> {
        self.priority(Query::Id(id))
    }

    /// Priority search with a caller-supplied distance-to-candidate capability.
    pub fn priority_with<D: CandidateDistance>(&self, dist: D) -> Result<VpTreePriority<'_, D>> {
        let root = self.root_checked()?;
        Ok(VpTreePriority::new(&self.nodes, root, dist))
    }

    fn range_from<D: CandidateDistance>(&self, root: u32, dist: &D, radius: f64) -> Vec<(u32, f64)> {
        let mut result = Vec::new();
        let mut open = vec![root];
        while let Some(idx) = open.pop() {
            let node = &self.nodes[idx as usize];
            let d = dist.distance_to(node.vantage());
            scan_singletons(node, d, dist, radius, |id, d2| {
                result.push((id, d2));
                radius
            });
            open.extend(
                node.children
                    .iter()
                    .filter(|c| c.bound(d) <= radius)
                    .map(|c| c.node),
            );
        }
        result
    }

    /// Best-first k-NN search. Requires `k > 0`.
    fn knn_from<D: CandidateDistance>(&self, root: u32, dist: &D, k: usize) -> Vec<(u32, f64)> {
        let mut knn = KnnHeap::new(k);
        let mut d_k = f64::INFINITY;
        let mut open = OpenSet::new();
        open.push(0.0, f64::NAN, root);

        while let Some(OpenNode { bound, node, .. }) = open.pop() {
            if knn.is_full() && bound > d_k {
                break;
            }
            let cur = &self.nodes[node as usize];
            let d = dist.distance_to(cur.vantage());
            d_k = scan_singletons(cur, d, dist, d_k, |id, d2| knn.insert(d2, id));
            for child in &cur.children {
                // A child never has a smaller bound than its parent.
                let b = child.bound(d).max(bound);
                if b <= d_k {
                    open.push(b, f64::NAN, child.node);
                }
            }
        }
        knn.into_sorted_vec()
    }
}

/// Offer every singleton of `node` within `radius` to `accept`, which returns
/// the (possibly shrunk) radius for the remaining ones. `d` is the query's
/// distance to the vantage point. Returns the final radius.
fn scan_singletons<D: CandidateDistance>(
    node: &VpNode,
    d: f64,
    dist: &D,
    mut radius: f64,
    mut accept: impl FnMut(u32, f64) -> f64,
) -> f64 {
    for (&id, &a) in node.singletons.iter().zip(node.dists.iter()) {
        let d2 = if a <= 0.0 {
            d
        } else if (d - a).abs() > radius {
            continue;
        } else {
            dist.distance_to(id)
        };
        if d2 <= radius {
            radius = accept(id, d2);
        }
    }
    radius
}

impl<'a, O, M: Metric<O>> MetricIndex<O> for VpTree<'a, O, M> {
    type Searcher<'s> = VpTreePriority<'s, QueryDistance<'s, O, M>>
    where
        Self: 's,
        O: 's;

    fn range(&self, query: Query<'_, O>, radius: f64) -> Result<Vec<(u32, f64)>> {
        VpTree::range(self, query, radius)
    }

    fn knn(&self, query: Query<'_, O>, k: usize) -> Result<Vec<(u32, f64)>> {
        VpTree::knn(self, query, k)
    }

    fn priority<'s>(&'s self, query: Query<'s, O>) -> Result<Self::Searcher<'s>> {
        VpTree::priority(self, query)
    }

    fn stats(&self) -> TreeStats {
        VpTree::stats(self)
    }

    fn len(&self) -> usize {
        VpTree::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{AbsoluteDifference, DistanceMetric};
    use crate::error::IndexError;
    use crate::vptree::VpTreeParams;

    fn brute_force(data: &[Vec<f32>], q: &[f32], k: usize) -> Vec<(u32, f64)> {
        let mut all: Vec<(u32, f64)> = data
            .iter()
            .enumerate()
            .map(|(i, x)| (i as u32, DistanceMetric::L1.eval(q, x)))
            .collect();
        all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        all.truncate(k);
        all
    }

    fn grid(n: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| vec![((i * 17) % 23) as f32, ((i * 11) % 19) as f32, (i % 5) as f32])
            .collect()
    }

    #[test]
    fn queries_before_build_fail() {
        let data = vec![0.0, 1.0];
        let tree = VpTree::new(&data, AbsoluteDifference, VpTreeParams::default()).unwrap();
        assert_eq!(tree.range_by_id(0, 1.0), Err(IndexError::NotBuilt));
        assert_eq!(tree.knn_by_id(0, 1), Err(IndexError::NotBuilt));
        assert!(matches!(tree.priority_by_id(0), Err(IndexError::NotBuilt)));
    }

    #[test]
    fn scenario_queries() {
        let data = vec![0.0, 1.0, 3.0, 6.0];
        let params = VpTreeParams::default().with_truncate(1).with_seed(11);
        let mut tree = VpTree::new(&data, AbsoluteDifference, params).unwrap();
        tree.build().unwrap();

        let mut hits = tree.range_by_id(0, 2.0).unwrap();
        hits.sort_by_key(|h| h.0);
        assert_eq!(hits, vec![(0, 0.0), (1, 1.0)]);
        assert_eq!(tree.knn_by_id(2, 2).unwrap(), vec![(2, 0.0), (1, 2.0)]);
        assert_eq!(
            tree.knn_by_id(2, 3).unwrap(),
            vec![(2, 0.0), (1, 2.0), (0, 3.0)]
        );
    }

    #[test]
    fn knn_and_range_match_brute_force() {
        let data = grid(300);
        let params = VpTreeParams::default().with_truncate(5).with_seed(5);
        let mut tree = VpTree::new(&data, DistanceMetric::L1, params).unwrap();
        tree.build().unwrap();

        for q in [vec![3.0f32, 4.0, 1.0], vec![30.0, -2.0, 0.5], vec![11.0, 9.0, 2.0]] {
            for k in [1, 7, 40] {
                assert_eq!(tree.knn_by_object(&q, k).unwrap(), brute_force(&data, &q, k));
            }
            let mut hits = tree.range_by_object(&q, 6.0).unwrap();
            hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            let expected: Vec<(u32, f64)> = brute_force(&data, &q, data.len())
                .into_iter()
                .filter(|h| h.1 <= 6.0)
                .collect();
            assert_eq!(hits, expected);
        }
    }
}
