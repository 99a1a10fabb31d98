/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Accumulates in f64. Returns 0.0 when either vector has zero norm or the
/// lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot: f64 = 0.0;
    let mut norm_a: f64 = 0.0;
    let mut norm_b: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

/// Cosine distance: `1 - cosine_similarity`, in `[0, 2]`.
///
/// Zero vectors and length mismatches yield 2.0 so they never pass a
/// practical distance cutoff.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 2.0;
    }
    let has_norm = |v: &[f32]| v.iter().any(|&x| x != 0.0);
    if !has_norm(a) || !has_norm(b) {
        return 2.0;
    }
    1.0 - cosine_similarity(a, b)
}

/// Element-wise arithmetic mean of `vectors`.
///
/// Returns `None` for an empty input or when the vectors disagree on length;
/// a mean over zero vectors is never produced.
pub fn mean<V: AsRef<[f32]>>(vectors: &[V]) -> Option<Vec<f32>> {
    let first = vectors.first()?.as_ref();
    let dim = first.len();

    let mut acc = vec![0.0f64; dim];
    for v in vectors {
        let v = v.as_ref();
        if v.len() != dim {
            return None;
        }
        for (slot, &x) in acc.iter_mut().zip(v.iter()) {
            *slot += x as f64;
        }
    }

    let n = vectors.len() as f64;
    Some(acc.into_iter().map(|x| (x / n) as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        let d = cosine_distance(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!(d.abs() < 1e-6, "identical: got {d}");
    }

    #[test]
    fn test_orthogonal() {
        let d = cosine_distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!((d - 1.0).abs() < 1e-6, "orthogonal: got {d}");
    }

    #[test]
    fn test_opposite() {
        let d = cosine_distance(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0]);
        assert!((d - 2.0).abs() < 1e-6, "opposite: got {d}");
    }

    #[test]
    fn test_scale_invariant() {
        let s = cosine_similarity(&[2.0, 0.0, 0.0], &[0.5, 0.5, 0.0]);
        assert!((s - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6, "got {s}");
    }

    #[test]
    fn test_zero_vector() {
        assert_eq!(cosine_distance(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0]), 2.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 2.0);
    }

    #[test]
    fn test_mean_unit_vectors() {
        let m = mean(&[
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        for x in m {
            assert!((x - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mean_empty_and_ragged() {
        let empty: [Vec<f32>; 0] = [];
        assert!(mean(&empty).is_none());
        assert!(mean(&[vec![1.0, 0.0], vec![1.0]]).is_none());
    }
}
