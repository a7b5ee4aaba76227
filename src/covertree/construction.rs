//! Cover tree bulk loading.
//!
//! `construct(routing, max_scale, candidates)`:
//!
//! 1. `max` = largest candidate distance to the routing object.
//! 2. Leaf if `max <= 0`, too few candidates remain (`< truncate`), or the scale
//!    `min(ceil(log_e(max)) - 1, max_scale)` reaches the numeric floor.
//! 3. Otherwise split the candidates into those covered by `e^scale` and the far
//!    rest. Covered ones build the routing object's own child one level lower.
//!    Each far representative, in order, gathers the remaining far candidates
//!    within `e^(scale - 1)` and becomes a singleton or the routing object of a
//!    sibling child.
//!
//! An empty far set means the scale was chosen too large (only possible through
//! rounding). That is logged and repaired by retrying one level lower with the
//! same inputs.

use smallvec::{smallvec, SmallVec};
use tracing::{debug, warn};

use super::{CoverTreeParams, Node};
use crate::distance::Metric;

/// An identifier annotated with its distance to the current routing object.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    id: u32,
    dist: f64,
}

/// Construction-local state. Owns the node arena until loading finishes.
pub(super) struct BulkLoader<'a, O, M> {
    data: &'a [O],
    metric: &'a M,
    expansion: f64,
    inv_log_expansion: f64,
    truncate: usize,
    scale_bottom: i32,
    /// Scale choices repaired by retrying one level lower.
    retries: usize,
    nodes: Vec<Node>,
}

impl<'a, O, M: Metric<O>> BulkLoader<'a, O, M> {
    pub(super) fn new(data: &'a [O], metric: &'a M, params: &CoverTreeParams) -> Self {
        let inv_log_expansion = 1.0 / params.expansion.ln();
        Self {
            data,
            metric,
            expansion: params.expansion,
            inv_log_expansion,
            truncate: params.truncate,
            // Below this scale the cover radius is no longer a normal f64.
            scale_bottom: (f64::MIN_POSITIVE.ln() * inv_log_expansion).ceil() as i32,
            retries: 0,
            nodes: Vec::new(),
        }
    }

    /// Build the tree rooted at `first` over `rest`; returns the arena and the root index.
    pub(super) fn load(mut self, first: u32, rest: &[u32]) -> (Vec<Node>, u32) {
        let mut candidates: Vec<Candidate> = rest
            .iter()
            .map(|&id| Candidate {
                id,
                dist: self.distance(first, id),
            })
            .collect();
        let root = self.construct(first, i32::MAX, &mut candidates);
        if self.retries > 0 {
            debug!(retries = self.retries, "cover tree scale repairs");
        }
        (self.nodes, root)
    }

    #[inline]
    fn distance(&self, a: u32, b: u32) -> f64 {
        self.metric
            .distance(&self.data[a as usize], &self.data[b as usize])
    }

    #[inline]
    fn scale_to_dist(&self, scale: i32) -> f64 {
        self.expansion.powi(scale)
    }

    #[inline]
    fn dist_to_scale(&self, dist: f64) -> i32 {
        (dist.ln() * self.inv_log_expansion).ceil() as i32
    }

    fn push(&mut self, node: Node) -> u32 {
        let idx = self.nodes.len() as u32;
        self.nodes.push(node);
        idx
    }

    /// Build the subtree for `cur`. `elems` is scratch space: it is consumed
    /// and left in an unspecified state.
    fn construct(&mut self, cur: u32, mut max_scale: i32, elems: &mut Vec<Candidate>) -> u32 {
        let max = elems.iter().map(|c| c.dist).fold(0.0, f64::max);
        loop {
            if max <= 0.0 || elems.len() < self.truncate {
                return self.leaf(cur, max, elems);
            }
            let scale = self.dist_to_scale(max).saturating_sub(1).min(max_scale);
            if scale <= self.scale_bottom {
                return self.leaf(cur, max, elems);
            }

            let mut far = Vec::new();
            exclude_not_covered(elems, self.scale_to_dist(scale), &mut far);
            if far.is_empty() {
                warn!(
                    max,
                    cover = self.scale_to_dist(scale),
                    scale,
                    "scale not chosen appropriately, retrying one level lower"
                );
                self.retries += 1;
                max_scale = scale - 1;
                continue;
            }
            return self.inner(cur, max, scale - 1, elems, far);
        }
    }

    fn leaf(&mut self, cur: u32, max: f64, elems: &[Candidate]) -> u32 {
        let mut singletons: SmallVec<[u32; 4]> = SmallVec::with_capacity(elems.len() + 1);
        singletons.push(cur);
        singletons.extend(elems.iter().map(|c| c.id));
        self.push(Node {
            singletons,
            max_dist: max,
            children: SmallVec::new(),
        })
    }

    fn inner(
        &mut self,
        cur: u32,
        max: f64,
        next_scale: i32,
        elems: &mut Vec<Candidate>,
        mut far: Vec<Candidate>,
    ) -> u32 {
        let mut singletons: SmallVec<[u32; 4]> = smallvec![cur];
        let mut children: SmallVec<[u32; 4]> = SmallVec::new();

        let cur_singleton = elems.is_empty();
        if !cur_singleton {
            children.push(self.construct(cur, next_scale, elems));
        }

        // Single forward pass: each far representative only looks at what is
        // still left in `far`, never at candidates already placed.
        let fmax = self.scale_to_dist(next_scale);
        while let Some(&Candidate { id: t, .. }) = far.first() {
            elems.clear();
            self.collect_by_cover(t, &mut far, fmax, elems);
            debug_assert_eq!(far[0].id, t, "representative must stay in front");
            if elems.is_empty() {
                singletons.push(t);
            } else {
                children.push(self.construct(t, next_scale, elems));
            }
            far.swap_remove(0);
        }

        // The routing object has no subtree of its own; keep it reachable.
        if cur_singleton && !children.is_empty() {
            singletons.push(cur);
        }

        self.push(Node {
            singletons,
            max_dist: max,
            children,
        })
    }

    /// Move every candidate after position 0 that lies within `fmax` of `cur`
    /// from `candidates` into `collect`, annotated with its distance to `cur`.
    fn collect_by_cover(
        &self,
        cur: u32,
        candidates: &mut Vec<Candidate>,
        fmax: f64,
        collect: &mut Vec<Candidate>,
    ) {
        debug_assert!(collect.is_empty());
        let mut i = 1;
        while i < candidates.len() {
            let id = candidates[i].id;
            let dist = self.distance(cur, id);
            if dist <= fmax {
                candidates.swap_remove(i);
                collect.push(Candidate { id, dist });
            } else {
                i += 1;
            }
        }
    }
}

/// Move every candidate farther than `fmax` into `collect`.
fn exclude_not_covered(candidates: &mut Vec<Candidate>, fmax: f64, collect: &mut Vec<Candidate>) {
    let mut i = 0;
    while i < candidates.len() {
        if candidates[i].dist > fmax {
            collect.push(candidates.swap_remove(i));
        } else {
            i += 1;
        }
    }
}
