//! Vantage-point tree bulk loading.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use smallvec::{smallvec, SmallVec};

use super::{VpChild, VpNode, VpTreeParams};
use crate::distance::Metric;

#[derive(Clone, Copy, Debug)]
struct Candidate {
    id: u32,
    dist: f64,
}

pub(super) struct VpBuilder<'a, O, M> {
    data: &'a [O],
    metric: &'a M,
    truncate: usize,
    sample_size: usize,
    rng: StdRng,
    nodes: Vec<VpNode>,
}

impl<'a, O, M: Metric<O>> VpBuilder<'a, O, M> {
    pub(super) fn new(data: &'a [O], metric: &'a M, params: &VpTreeParams) -> Self {
        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        Self {
            data,
            metric,
            truncate: params.truncate,
            sample_size: params.sample_size,
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
        }
    }

    /// Build over a non-empty id list; returns the arena and the root index.
    pub(super) fn load(mut self, ids: &[u32]) -> (Vec<VpNode>, u32) {
        debug_assert!(!ids.is_empty());
        let mut items: Vec<Candidate> = ids.iter().map(|&id| Candidate { id, dist: 0.0 }).collect();
        let root = self.build(&mut items);
        (self.nodes, root)
    }

    #[inline]
    fn distance(&self, a: u32, b: u32) -> f64 {
        self.metric
            .distance(&self.data[a as usize], &self.data[b as usize])
    }

    fn push(&mut self, node: VpNode) -> u32 {
        let idx = self.nodes.len() as u32;
        self.nodes.push(node);
        idx
    }

    fn build(&mut self, items: &mut [Candidate]) -> u32 {
        if items.len() > self.truncate {
            let vp = self.select_vantage_point(items);
            items.swap(0, vp);
        }
        let vp = items[0].id;
        for c in &mut items[1..] {
            c.dist = self.distance(vp, c.id);
        }
        if items.len() <= self.truncate {
            return self.push(VpNode {
                singletons: items.iter().map(|c| c.id).collect(),
                dists: std::iter::once(0.0)
                    .chain(items[1..].iter().map(|c| c.dist))
                    .collect(),
                children: SmallVec::new(),
            });
        }

        let (_, rest) = items.split_at_mut(1);
        let dups = partition_duplicates(rest);
        let mut singletons: SmallVec<[u32; 4]> = smallvec![vp];
        singletons.extend(rest[..dups].iter().map(|c| c.id));
        let dists: SmallVec<[f64; 4]> = singletons.iter().map(|_| 0.0).collect();

        let rest = &mut rest[dups..];
        let mut children: SmallVec<[VpChild; 2]> = SmallVec::new();
        if !rest.is_empty() {
            let mid = rest.len() / 2;
            rest.select_nth_unstable_by(mid, |a, b| a.dist.total_cmp(&b.dist));
            let (near, far) = rest.split_at_mut(mid);
            for side in [near, far] {
                if side.is_empty() {
                    continue;
                }
                let (low, high) = side.iter().fold((f64::INFINITY, 0.0f64), |(lo, hi), c| {
                    (lo.min(c.dist), hi.max(c.dist))
                });
                let node = self.build(side);
                children.push(VpChild { node, low, high });
            }
        }

        self.push(VpNode {
            singletons,
            dists,
            children,
        })
    }

    /// Index of the sampled candidate whose distances to a random reference set
    /// have the largest variance.
    fn select_vantage_point(&mut self, items: &[Candidate]) -> usize {
        let amount = self.sample_size.min(items.len());
        if amount <= 1 {
            return 0;
        }
        let candidates = sample(&mut self.rng, items.len(), amount);
        let refs = sample(&mut self.rng, items.len(), amount);

        let mut best = 0;
        let mut best_spread = f64::NEG_INFINITY;
        for cand in candidates.iter() {
            let vp = items[cand].id;
            let (mut sum, mut sum_sq) = (0.0, 0.0);
            for r in refs.iter() {
                let d = self.distance(vp, items[r].id);
                sum += d;
                sum_sq += d * d;
            }
            let mean = sum / amount as f64;
            let spread = sum_sq / amount as f64 - mean * mean;
            if spread > best_spread {
                best_spread = spread;
                best = cand;
            }
        }
        best
    }
}

/// Move candidates at distance 0 to the front; returns how many there are.
fn partition_duplicates(items: &mut [Candidate]) -> usize {
    let mut k = 0;
    for i in 0..items.len() {
        if items[i].dist <= 0.0 {
            items.swap(k, i);
            k += 1;
        }
    }
    k
}
