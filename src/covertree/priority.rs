//! Cover tree priority search.

use super::Node;
use crate::index::heap::{OpenNode, OpenSet};
use crate::index::{CandidateDistance, PrioritySearch};

/// Incremental best-first cursor over a cover tree.
///
/// Nodes are expanded in order of their lower bound. The singletons of the
/// expanded node are then yielded one by one without putting them on the heap;
/// their bounds come from the node's routing distance and covering radius.
pub struct CoverTreePriority<'t, D> {
    nodes: &'t [Node],
    dist: D,
    open: OpenSet,
    threshold: f64,
    /// Node whose singletons are being yielded.
    node: Option<u32>,
    /// Position in that node's singleton list.
    offset: usize,
    routing_dist: f64,
    max_dist: f64,
    /// Largest bound expanded so far.
    lb: f64,
}

impl<'t, D: CandidateDistance> CoverTreePriority<'t, D> {
    pub(super) fn new(nodes: &'t [Node], root: Option<u32>, dist: D) -> Self {
        let mut open = OpenSet::new();
        if let Some(root) = root {
            let node = &nodes[root as usize];
            let d = dist.distance_to(node.routing());
            open.push(d - node.max_dist, d, root);
        }
        let mut searcher = Self {
            nodes,
            dist,
            open,
            threshold: f64::INFINITY,
            node: None,
            offset: 0,
            routing_dist: 0.0,
            max_dist: 0.0,
            lb: 0.0,
        };
        searcher.advance();
        searcher
    }

    fn singletons(&self) -> &'t [u32] {
        match self.node {
            Some(n) => self.nodes[n as usize].singletons.as_slice(),
            None => &[],
        }
    }

    /// Expand the next node of the heap. Returns false once nothing within the
    /// cutoff remains.
    fn advance_queue(&mut self) -> bool {
        match self.open.peek_bound() {
            None => return false,
            Some(bound) if bound > self.threshold => {
                // Heap order: nothing left can come back under the cutoff.
                self.open.clear();
                return false;
            }
            Some(_) => {}
        }
        let Some(OpenNode { bound, dist: d, node }) = self.open.pop() else {
            return false;
        };
        let nodes = self.nodes;
        let cur = &nodes[node as usize];

        self.lb = self.lb.max(bound);
        self.routing_dist = d;
        self.max_dist = cur.max_dist;
        self.node = Some(node);
        self.offset = 0;

        let routing = cur.routing();
        for &child in &cur.children {
            let c = &nodes[child as usize];
            let cd = if c.routing() == routing {
                d
            } else {
                self.dist.distance_to(c.routing())
            };
            let bound = cd - c.max_dist;
            if bound <= self.threshold {
                self.open.push(bound, cd, child);
            }
        }
        // The routing object of an inner node lives on in a child.
        if !cur.is_leaf() {
            self.offset = 1;
        }
        true
    }

    /// Whether the current candidate is the routing object of its node.
    #[inline]
    fn at_routing(&self) -> bool {
        self.offset == 0
    }
}

impl<D: CandidateDistance> PrioritySearch for CoverTreePriority<'_, D> {
    fn valid(&self) -> bool {
        self.offset < self.singletons().len()
    }

    fn advance(&mut self) {
        if self.valid() {
            self.offset += 1;
        }
        loop {
            if self.valid() {
                return;
            }
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
        self.routing_dist
    }

    fn approximate_accuracy(&self) -> f64 {
        if self.at_routing() {
            0.0
        } else {
            self.max_dist
        }
    }

    fn lower_bound(&self) -> f64 {
        if self.at_routing() {
            self.routing_dist
        } else {
            self.lb.max((self.routing_dist - self.max_dist).max(0.0))
        }
    }

    fn upper_bound(&self) -> f64 {
        if self.at_routing() {
            self.routing_dist
        } else {
            self.routing_dist + self.max_dist
        }
    }

    fn compute_exact_distance(&self) -> f64 {
        if self.at_routing() {
            return self.routing_dist;
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
    use crate::covertree::{CoverTree, CoverTreeParams};
    use crate::distance::AbsoluteDifference;
    use crate::index::PrioritySearch;

    #[test]
    fn scenario_cutoff_prunes_far_nodes() {
        let data = vec![0.0, 1.0, 3.0, 6.0];
        let mut tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::new(2.0, 1)).unwrap();
        tree.build().unwrap();

        let mut search = tree.priority_by_id(3).unwrap();
        search.decrease_cutoff(4.0);

        let mut seen = Vec::new();
        while let Some(id) = search.id() {
            seen.push((id, search.compute_exact_distance()));
            search.advance();
        }
        assert_eq!(seen, vec![(3, 0.0), (2, 3.0)]);
        assert!(!search.valid());
    }

    #[test]
    fn without_cutoff_every_object_appears_once() {
        let data: Vec<f64> = (0..50).map(|i| ((i * 37) % 101) as f64).collect();
        let mut tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::new(1.3, 2)).unwrap();
        tree.build().unwrap();

        let mut search = tree.priority_by_object(&17.0).unwrap();
        let mut ids = Vec::new();
        while let Some(id) = search.id() {
            let exact = search.compute_exact_distance();
            assert!(search.lower_bound() <= exact + 1e-12);
            assert!(exact <= search.upper_bound() + 1e-12);
            ids.push(id);
            search.advance();
        }
        ids.sort_unstable();
        assert_eq!(ids, (0..50).collect::<Vec<u32>>());
    }

    #[test]
    fn nearest_matches_knn() {
        let data: Vec<f64> = (0..80).map(|i| ((i * 13) % 29) as f64 * 0.5).collect();
        let mut tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::new(1.5, 3)).unwrap();
        tree.build().unwrap();

        for k in [1, 5, 17, 80, 100] {
            let dynamic = tree.priority_by_object(&6.2).unwrap().nearest(k);
            assert_eq!(dynamic, tree.knn_by_object(&6.2, k).unwrap(), "k = {k}");
        }
    }

    #[test]
    fn empty_tree_cursor_is_invalid() {
        let data: Vec<f64> = Vec::new();
        let mut tree = CoverTree::new(&data, AbsoluteDifference, CoverTreeParams::default()).unwrap();
        tree.build().unwrap();

        let search = tree.priority_by_object(&1.0).unwrap();
        assert!(!search.valid());
        assert_eq!(search.id(), None);
    }
}
