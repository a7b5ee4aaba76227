//! Cover tree range and k-NN search.
//!
//! Both searches prune with the covering radius: by the triangle inequality no
//! object below a node is closer to the query than `d(q, routing) - max_dist`.

use super::{CoverTree, CoverTreePriority};
use crate::distance::Metric;
use crate::error::Result;
use crate::index::heap::{KnnHeap, OpenNode, OpenSet};
use crate::index::{CandidateDistance, MetricIndex, Query, QueryDistance, TreeStats};

impl<'a, O, M: Metric<O>> CoverTree<'a, O, M> {
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
    ) -> Result<CoverTreePriority<'s, QueryDistance<'s, O, M>>> {
        let root = self.root_checked()?;
        let dist = QueryDistance::new(query, self.data, &self.metric)?;
        Ok(CoverTreePriority::new(&self.nodes, root, dist))
    }

    /// Priority search around an external object.
    pub fn priority_by_object<'s>(
        &'s self,
        query: &'s O,
    ) -> Result<CoverTreePriority<'s, QueryDistance<'s, O, M>>> {
        self.priority(Query::Object(query))
    }

    /// Priority search around an indexed object.
    pub fn priority_by_id(&self, id: u32) -> Result<CoverTreePriority<'_, QueryDistance<'_, O, M>>> {
        self.priority(Query::Id(id))
    }

    /// Priority search with a caller-supplied distance-to-candidate capability.
    pub fn priority_with<D: CandidateDistance>(&self, dist: D) -> Result<CoverTreePriority<'_, D>> {
        let root = self.root_checked()?;
        Ok(CoverTreePriority::new(&self.nodes, root, dist))
    }

    /// Depth-first range search with an explicit stack.
    fn range_from<D: CandidateDistance>(&self, root: u32, dist: &D, radius: f64) -> Vec<(u32, f64)> {
        let mut result = Vec::new();
        let mut open = vec![root];
        while let Some(idx) = open.pop() {
            let node = &self.nodes[idx as usize];
            let d = dist.distance_to(node.routing());
            // Nothing below can be within range.
            if d - node.max_dist > radius {
                continue;
            }
            if node.is_leaf() {
                if d <= radius {
                    result.push((node.routing(), d));
                }
            } else {
                open.extend(node.children.iter().copied());
            }
            for &id in &node.singletons[1..] {
                let d2 = dist.distance_to(id);
                if d2 <= radius {
                    result.push((id, d2));
                }
            }
        }
        result
    }

    /// Best-first k-NN search over the open node set. Requires `k > 0`.
    fn knn_from<D: CandidateDistance>(&self, root: u32, dist: &D, k: usize) -> Vec<(u32, f64)> {
        let mut knn = KnnHeap::new(k);
        let mut d_k = f64::INFINITY;
        let mut open = OpenSet::new();

        let root_node = &self.nodes[root as usize];
        let d = dist.distance_to(root_node.routing());
        open.push(d - root_node.max_dist, d, root);

        while let Some(OpenNode { bound, dist: d, node }) = open.pop() {
            // Every remaining bound is at least as large.
            if knn.is_full() && bound > d_k {
                break;
            }
            let cur = &self.nodes[node as usize];
            let routing = cur.routing();
            if cur.is_leaf() {
                if d <= d_k {
                    d_k = knn.insert(d, routing);
                }
            } else {
                for &child in &cur.children {
                    let c = &self.nodes[child as usize];
                    let cd = if c.routing() == routing {
                        d
                    } else {
                        dist.distance_to(c.routing())
                    };
                    let bound = cd - c.max_dist;
                    if bound <= d_k {
                        open.push(bound, cd, child);
                    }
                }
            }
            for &id in &cur.singletons[1..] {
                let d2 = dist.distance_to(id);
                if d2 <= d_k {
                    d_k = knn.insert(d2, id);
                }
            }
        }
        knn.into_sorted_vec()
    }
}

impl<'a, O, M: Metric<O>> MetricIndex<O> for CoverTree<'a, O, M> {
    type Searcher<'s> = CoverTreePriority<'s, QueryDistance<'s, O, M>>
    where
        Self: 's,
        O: 's;

    fn range(&self, query: Query<'_, O>, radius: f64) -> Result<Vec<(u32, f64)>> {
        CoverTree::range(self, query, radius)
    }

    fn knn(&self, query: Query<'_, O>, k: usize) -> Result<Vec<(u32, f64)>> {
        CoverTree::knn(self, query, k)
    }

    fn priority<'s>(&'s self, query: Query<'s, O>) -> Result<Self::Searcher<'s>> {
        CoverTree::priority(self, query)
    }

    fn stats(&self) -> TreeStats {
        CoverTree::stats(self)
    }

    fn len(&self) -> usize {
        CoverTree::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covertree::CoverTreeParams;
    use crate::distance::AbsoluteDifference;
    use crate::error::IndexError;

    fn line() -> Vec<f64> {
        vec![0.0, 1.0, 3.0, 6.0]
    }

    fn sorted(mut v: Vec<(u32, f64)>) -> Vec<(u32, f64)> {
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v
    }

    #[test]
    fn queries_before_build_fail() {
        let data = line();
        let tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::default()).unwrap();
        assert_eq!(tree.range_by_id(0, 1.0), Err(IndexError::NotBuilt));
        assert_eq!(tree.knn_by_object(&1.0, 1), Err(IndexError::NotBuilt));
        assert!(matches!(tree.priority_by_id(0), Err(IndexError::NotBuilt)));
    }

    #[test]
    fn range_scenario() {
        let data = line();
        let mut tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::new(2.0, 1)).unwrap();
        tree.build().unwrap();

        let hits = sorted(tree.range_by_id(0, 2.0).unwrap());
        assert_eq!(hits, vec![(0, 0.0), (1, 1.0)]);

        let hits = sorted(tree.range_by_object(&4.0, 1.0).unwrap());
        assert_eq!(hits, vec![(2, 1.0)]);

        assert!(tree.range_by_object(&100.0, 10.0).unwrap().is_empty());
        assert!(tree.range_by_id(0, -1.0).unwrap().is_empty());
    }

    #[test]
    fn knn_scenario() {
        let data = line();
        let mut tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::new(2.0, 1)).unwrap();
        tree.build().unwrap();

        assert_eq!(tree.knn_by_id(2, 2).unwrap(), vec![(2, 0.0), (1, 2.0)]);
        // P0 and P3 tie at distance 3 from P2; the smaller id wins.
        assert_eq!(
            tree.knn_by_id(2, 3).unwrap(),
            vec![(2, 0.0), (1, 2.0), (0, 3.0)]
        );
        assert_eq!(tree.knn_by_id(2, 10).unwrap().len(), 4);
        assert!(tree.knn_by_id(2, 0).unwrap().is_empty());
    }

    #[test]
    fn unknown_query_id_is_an_error() {
        let data = line();
        let mut tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::default()).unwrap();
        tree.build().unwrap();
        assert_eq!(
            tree.knn_by_id(9, 1),
            Err(IndexError::UnknownId { id: 9, len: 4 })
        );
    }

    #[test]
    fn injected_distance_matches_query_object() {
        let data = line();
        let mut tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::new(1.5, 1)).unwrap();
        tree.build().unwrap();

        let column = |id: u32| (data[id as usize] - 2.5f64).abs();
        assert_eq!(
            tree.knn_with(&column, 2).unwrap(),
            tree.knn_by_object(&2.5, 2).unwrap()
        );
        assert_eq!(
            sorted(tree.range_with(&column, 1.5).unwrap()),
            sorted(tree.range_by_object(&2.5, 1.5).unwrap())
        );
    }
}
