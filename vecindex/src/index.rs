use std::cmp::Ordering;

use crate::cosine::cosine_distance;
use crate::error::VecError;

/// A single scan hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<K> {
    /// Identifier of the matched candidate.
    pub id: K,

    /// Cosine distance between the query and the candidate.
    /// Lower values indicate higher similarity.
    pub distance: f32,
}

impl<K> Neighbor<K> {
    /// `1 - distance`.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Exact nearest-neighbor search by linear scan.
///
/// There is no persistent structure: every call scans the candidates it is
/// given. Suitable for bounded candidate sets (embedded documents, active
/// cluster centroids).
#[derive(Debug, Clone, Copy)]
pub struct SimilarityIndex {
    dim: usize,
}

impl SimilarityIndex {
    /// Creates an index for vectors of dimension `dim`. Panics if `dim` is 0.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "vecindex: dim must be positive");
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Fails with [`VecError::DimensionMismatch`] unless `v` has the
    /// configured dimension.
    pub fn check(&self, v: &[f32]) -> Result<(), VecError> {
        if v.len() != self.dim {
            return Err(VecError::DimensionMismatch {
                expected: self.dim,
                got: v.len(),
            });
        }
        Ok(())
    }

    /// Returns up to `limit` candidates with `distance < max_distance`,
    /// ordered by ascending distance.
    ///
    /// Ties keep scan order. Candidates without a vector, or whose vector
    /// has the wrong dimension, are skipped.
    pub fn nearest<K, V, I>(
        &self,
        query: &[f32],
        candidates: I,
        max_distance: f32,
        limit: usize,
    ) -> Result<Vec<Neighbor<K>>, VecError>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        V: AsRef<[f32]>,
    {
        self.check(query)?;
        if limit == 0 {
            return Ok(vec![]);
        }

        let mut hits: Vec<Neighbor<K>> = candidates
            .into_iter()
            .filter_map(|(id, vector)| {
                let vector = vector?;
                let vector = vector.as_ref();
                if vector.len() != self.dim {
                    return None;
                }
                let distance = cosine_distance(query, vector);
                (distance < max_distance).then_some(Neighbor { id, distance })
            })
            .collect();

        // sort_by is stable: equal distances keep scan order.
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<(&'static str, Option<Vec<f32>>)> {
        vec![
            ("a", Some(vec![1.0, 0.0, 0.0])),
            ("b", Some(vec![0.0, 1.0, 0.0])),
            ("c", Some(vec![0.9, 0.1, 0.0])),
            ("none", None),
        ]
    }

    #[test]
    fn test_nearest_ordered() {
        let idx = SimilarityIndex::new(3);
        let hits = idx.nearest(&[1.0, 0.0, 0.0], candidates(), 2.0, 10).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert!(hits[0].distance.abs() < 1e-6);
        assert!((hits[0].similarity() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cutoff_is_strict() {
        let idx = SimilarityIndex::new(3);
        // "b" is orthogonal: distance exactly 1.0, excluded by `< 1.0`.
        let hits = idx.nearest(&[1.0, 0.0, 0.0], candidates(), 1.0, 10).unwrap();
        assert!(hits.iter().all(|h| h.id != "b"));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_limit() {
        let idx = SimilarityIndex::new(3);
        let hits = idx.nearest(&[1.0, 0.0, 0.0], candidates(), 2.0, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");

        let none = idx.nearest(&[1.0, 0.0, 0.0], candidates(), 2.0, 0).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_no_match_returns_empty() {
        let idx = SimilarityIndex::new(3);
        let hits = idx.nearest(&[0.0, 0.0, 1.0], candidates(), 0.5, 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_ties_keep_scan_order() {
        let idx = SimilarityIndex::new(2);
        let cands: Vec<(u64, Option<Vec<f32>>)> = vec![
            (3, Some(vec![0.6, 0.8])),
            (1, Some(vec![0.6, 0.8])),
            (2, Some(vec![0.6, 0.8])),
        ];
        let hits = idx.nearest(&[1.0, 0.0], cands, 1.0, 10).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let idx = SimilarityIndex::new(3);
        let err = idx.nearest(&[1.0, 0.0], candidates(), 2.0, 10).unwrap_err();
        assert_eq!(err, VecError::DimensionMismatch { expected: 3, got: 2 });
    }

    #[test]
    fn test_candidate_wrong_dimension_skipped() {
        let idx = SimilarityIndex::new(2);
        let cands: Vec<(&str, Option<Vec<f32>>)> =
            vec![("short", Some(vec![1.0])), ("ok", Some(vec![1.0, 0.0]))];
        let hits = idx.nearest(&[1.0, 0.0], cands, 2.0, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "ok");
    }
}
