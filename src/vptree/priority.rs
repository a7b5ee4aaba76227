//! Vantage-point tree priority search.

use super::VpNode;
use crate::index::heap::{OpenNode, OpenSet};
use crate::index::{CandidateDistance, PrioritySearch};

/// Incremental best-first cursor over a vantage-point tree.
///
/// Expanding a node evaluates its vantage point once; the node's singletons
/// are then yielded with bounds derived from their stored distance to it.
pub struct VpTreePriority<'t, D> {
    nodes: &'t [VpNode],
    dist: D,
    open: OpenSet,
    threshold: f64,
    node: Option<u32>,
    offset: usize,
    vantage_dist: f64,
    lb: f64,
}

impl<'t, D: CandidateDistance> VpTreePriority<'t, D> {
    pub(super) fn new(nodes: &'t [VpNode], root: Option<u32>, dist: D) -> Self {
        let mut open = OpenSet::new();
        if let Some(root) = root {
            open.push(0.0, f64::NAN, root);
        }
        let mut searcher = Self {
            nodes,
            dist,
            open,
            threshold: f64::INFINITY,
            node: None,
            offset: 0,
            vantage_dist: 0.0,
            lb: 0.0,
        };
        searcher.advance();
        searcher
    }

    fn current(&self) -> Option<&'t VpNode> {
        let nodes = self.nodes;
        self.node.map(|n| &nodes[n as usize])
    }

    fn singletons(&self) -> &'t [u32] {
        match self.current() {
            Some(node) => node.singletons.as_slice(),
            None => &[],
        }
    }

    /// Stored distance of the current candidate to its vantage point.
    fn stored(&self) -> f64 {
        self.current()
            .and_then(|node| node.dists.get(self.offset).copied())
            .unwrap_or(0.0)
    }

    fn advance_queue(&mut self) -> bool {
        match self.open.peek_bound() {
            None => return false,
            Some(bound) if bound > self.threshold => {
                self.open.clear();
                return false;
            }
            Some(_) => {}
        }
        let Some(OpenNode { bound, node, .. }) = self.open.pop() else {
            return false;
        };
        let cur = &self.nodes[node as usize];
        let d = self.dist.distance_to(cur.vantage());

        self.lb = self.lb.max(bound);
        self.vantage_dist = d;
        self.node = Some(node);
        self.offset = 0;

        for child in &cur.children {
            let b = child.bound(d).max(bound);
            if b <= self.threshold {
                self.open.push(b, f64::NAN, child.node);
            }
        }
        true
    }
}

impl<D: CandidateDistance> PrioritySearch for VpTreePriority<'_, D> {
    fn valid(&self) -> bool {
        self.offset < self.singletons().len()
    }

    fn advance(&mut self) {
        if self.valid() {
            self.offset += 1;
        }
        while !self.valid() {
            if !self.advance_queue() {
                self.node = None;
                return;
            }
        }
    }

    fn decrease_cutoff(&mut self, threshold: f64) {
        if threshold < self.threshold {
            self.threshold = threshold;
        }
    }

    fn id(&self) -> Option<u32> {
        self.singletons().get(self.offset).copied()
    }

    fn approximate_distance(&self) -> f64 {
        self.vantage_dist
    }

    fn approximate_accuracy(&self) -> f64 {
        self.stored()
    }

    fn lower_bound(&self) -> f64 {
        let a = self.stored();
        if a <= 0.0 {
            self.vantage_dist
        } else {
            self.lb.max((self.vantage_dist - a).abs())
        }
    }

    fn upper_bound(&self) -> f64 {
        self.vantage_dist + self.stored()
    }

    fn compute_exact_distance(&self) -> f64 {
        if self.stored() <= 0.0 {
            return self.vantage_dist;
        }
        self.id()
            .map_or(f64::INFINITY, |id| self.dist.distance_to(id))
    }

    fn all_lower_bound(&self) -> f64 {
        self.lb
    }
}

#[cfg(test)]
mod tests {
    use crate::distance::AbsoluteDifference;
    use crate::index::PrioritySearch;
    use crate::vptree::{VpTree, VpTreeParams};

    fn tree(data: &[f64], truncate: usize) -> VpTree<'_, f64, AbsoluteDifference> {
        let params = VpTreeParams::default().with_truncate(truncate).with_seed(9);
        let mut tree = VpTree::new(data, AbsoluteDifference, params).unwrap();
        tree.build().unwrap();
        tree
    }

    #[test]
    fn cutoff_scenario() {
        let data = vec![0.0, 1.0, 3.0, 6.0];
        let tree = tree(&data, 1);
        let mut search = tree.priority_by_id(3).unwrap();
        search.decrease_cutoff(4.0);

        let mut seen = Vec::new();
        while let Some(id) = search.id() {
            let d = search.compute_exact_distance();
            if d <= 4.0 {
                seen.push((id, d));
            }
            search.advance();
        }
        seen.sort_by_key(|s| s.0);
        assert_eq!(seen, vec![(2, 3.0), (3, 0.0)]);
    }

    #[test]
    fn bounds_hold_and_every_object_appears_once() {
        let data: Vec<f64> = (0..120).map(|i| ((i * 41) % 97) as f64 * 0.25).collect();
        let tree = tree(&data, 3);
        let mut search = tree.priority_by_object(&7.3).unwrap();

        let mut ids = Vec::new();
        let mut last_all = 0.0;
        while let Some(id) = search.id() {
            let exact = search.compute_exact_distance();
            assert!(search.lower_bound() <= exact + 1e-12);
            assert!(exact <= search.upper_bound() + 1e-12);
            assert!(search.all_lower_bound() >= last_all);
            last_all = search.all_lower_bound();
            ids.push(id);
            search.advance();
        }
        ids.sort_unstable();
        assert_eq!(ids, (0..120).collect::<Vec<u32>>());
    }

    #[test]
    fn nearest_matches_knn() {
        let data: Vec<f64> = (0..90).map(|i| ((i * 13) % 31) as f64).collect();
        let tree = tree(&data, 4);
        for k in [1, 3, 10, 90] {
            assert_eq!(
                tree.priority_by_object(&12.5).unwrap().nearest(k),
                tree.knn_by_object(&12.5, k).unwrap(),
                "k = {k}"
            );
        }
    }
}
