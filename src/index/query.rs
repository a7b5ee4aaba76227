//! Query kinds and the distance-to-candidate capability.

use crate::distance::Metric;
use crate::error::{IndexError, Result};

/// What a search is anchored on.
#[derive(Debug)]
pub enum Query<'q, O> {
    /// An external object, not necessarily part of the relation.
    Object(&'q O),
    /// An object of the relation, named by its identifier.
    Id(u32),
}

impl<O> Clone for Query<'_, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for Query<'_, O> {}

impl<'q, O> Query<'q, O> {
    /// Resolve the query to an object of `data` (identifier lookup is O(1)).
    pub(crate) fn resolve(self, data: &'q [O]) -> Result<&'q O> {
        match self {
            Query::Object(obj) => Ok(obj),
            Query::Id(id) => data.get(id as usize).ok_or(IndexError::UnknownId {
                id,
                len: data.len(),
            }),
        }
    }
}

/// Distance from a fixed query to a candidate identifier.
///
/// All search engines are written against this capability. Closures
/// `Fn(u32) -> f64` implement it, so a caller can inject precomputed
/// distances instead of a query object.
pub trait CandidateDistance {
    /// Distance from the query to object `id`.
    fn distance_to(&self, id: u32) -> f64;
}

impl<F> CandidateDistance for F
where
    F: Fn(u32) -> f64,
{
    #[inline]
    fn distance_to(&self, id: u32) -> f64 {
        self(id)
    }
}

/// [`CandidateDistance`] for a query object against a relation.
pub struct QueryDistance<'a, O, M> {
    query: &'a O,
    data: &'a [O],
    metric: &'a M,
}

impl<'a, O, M: Metric<O>> QueryDistance<'a, O, M> {
    /// Resolve `query` against `data` and bind it to `metric`.
    pub fn new(query: Query<'a, O>, data: &'a [O], metric: &'a M) -> Result<Self> {
        Ok(Self {
            query: query.resolve(data)?,
            data,
            metric,
        })
    }
}

impl<O, M: Metric<O>> CandidateDistance for QueryDistance<'_, O, M> {
    #[inline]
    fn distance_to(&self, id: u32) -> f64 {
        self.metric.distance(self.query, &self.data[id as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::AbsoluteDifference;

    #[test]
    fn by_id_and_by_object_agree() {
        let data = [0.0, 1.0, 3.0, 6.0];
        let by_id = QueryDistance::new(Query::Id(2), &data, &AbsoluteDifference).unwrap();
        let by_obj = QueryDistance::new(Query::Object(&3.0), &data, &AbsoluteDifference).unwrap();
        for id in 0..4 {
            assert_eq!(by_id.distance_to(id), by_obj.distance_to(id));
        }
    }

    #[test]
    fn unknown_id_is_rejected() {
        let data = [0.0, 1.0];
        let err = QueryDistance::new(Query::Id(2), &data, &AbsoluteDifference)
            .err()
            .unwrap();
        assert_eq!(err, IndexError::UnknownId { id: 2, len: 2 });
    }
}
