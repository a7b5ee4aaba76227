//! Distance capabilities.
//!
//! Every index in this crate treats the distance as an opaque, pure function
//! `distance(a, b) -> f64`. Exactness of all three query kinds rests on it
//! being a **metric**:
//!
//! - non-negative, with `d(a, a) = 0`
//! - symmetric: `d(a, b) = d(b, a)`
//! - triangle inequality: `d(a, c) <= d(a, b) + d(b, c)`
//!
//! Subtree pruning (`d(q, routing) - radius > r`) is only sound under the triangle
//! inequality. That is why cosine distance and inner-product "distance" are not
//! offered here: they violate it, and an index built on them silently loses results.
//! Angular distance (the normalized angle) is the metric alternative.
//!
//! Any closure `Fn(&O, &O) -> f64` is a [`Metric`], so domain-specific distances
//! (edit distance, Hamming, geodesic) plug in without a wrapper type.

/// A distance function over objects of type `O`.
///
/// Implementations must be deterministic and total. The index never retries a
/// distance computation and does not catch panics raised by it.
pub trait Metric<O: ?Sized> {
    /// Distance between `a` and `b`.
    fn distance(&self, a: &O, b: &O) -> f64;
}

impl<O: ?Sized, F> Metric<O> for F
where
    F: Fn(&O, &O) -> f64,
{
    #[inline]
    fn distance(&self, a: &O, b: &O) -> f64 {
        self(a, b)
    }
}

/// Metrics over dense `f32` vectors.
///
/// Accumulation happens in `f64`, so bounds derived from these distances stay
/// consistent with the `f64` bookkeeping of the trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceMetric {
    /// Euclidean (L2) distance.
    #[default]
    L2,
    /// Manhattan (L1) distance.
    L1,
    /// Chebyshev (L-infinity) distance.
    LInf,
    /// Angular distance $\arccos(\cos(a,b)) / \pi$, in `[0,1]`.
    Angular,
}

impl DistanceMetric {
    /// Compute distance between two vectors.
    ///
    /// Vectors must have equal length; extra trailing components are ignored in
    /// release builds.
    #[inline]
    #[must_use]
    pub fn eval(self, a: &[f32], b: &[f32]) -> f64 {
        debug_assert_eq!(a.len(), b.len(), "dimension mismatch");
        match self {
            DistanceMetric::L2 => l2_distance(a, b),
            DistanceMetric::L1 => l1_distance(a, b),
            DistanceMetric::LInf => linf_distance(a, b),
            DistanceMetric::Angular => angular_distance(a, b),
        }
    }
}

impl<T: AsRef<[f32]> + ?Sized> Metric<T> for DistanceMetric {
    #[inline]
    fn distance(&self, a: &T, b: &T) -> f64 {
        self.eval(a.as_ref(), b.as_ref())
    }
}

/// Absolute difference `|a - b|` of scalars: the one-dimensional Euclidean metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AbsoluteDifference;

impl Metric<f64> for AbsoluteDifference {
    #[inline]
    fn distance(&self, a: &f64, b: &f64) -> f64 {
        (a - b).abs()
    }
}

/// L2 (Euclidean) distance.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// L1 (Manhattan) distance.
#[inline]
#[must_use]
pub fn l1_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (f64::from(x) - f64::from(y)).abs())
        .sum()
}

/// L-infinity (Chebyshev) distance.
#[inline]
#[must_use]
pub fn linf_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (f64::from(x) - f64::from(y)).abs())
        .fold(0.0, f64::max)
}

/// Angular distance $\arccos(\cos(a,b)) / \pi$, in `[0,1]`.
///
/// A zero vector has no direction. It is placed at distance 0.5 from every
/// non-zero vector and 0 from other zero vectors, which keeps the triangle
/// inequality intact.
#[inline]
#[must_use]
pub fn angular_distance(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    match (na > 0.0, nb > 0.0) {
        (false, false) => 0.0,
        (true, true) => {
            let cos = (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0);
            cos.acos() / std::f64::consts::PI
        }
        _ => 0.5,
    }
}
