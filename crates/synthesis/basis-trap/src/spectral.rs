use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};
use synthesis_types::euclidean_distance;

/// Lipschitz estimates below this are raised to it.
pub const MIN_LIPSCHITZ: f64 = 0.1;
/// Pairs closer than this are skipped when estimating `L`.
const MIN_PAIR_DISTANCE: f64 = 1e-9;

/// One spectral evaluation of a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralReading {
    pub sample_count: usize,
    /// Spectral gap.
    pub min_eigenvalue: f64,
    pub max_eigenvalue: f64,
    pub lipschitz: f64,
    pub trigger_threshold: f64,
    pub recovery_threshold: f64,
}

impl SpectralReading {
    pub fn is_trapped(&self) -> bool {
        self.min_eigenvalue < self.trigger_threshold
    }

    pub fn is_recovered(&self) -> bool {
        self.min_eigenvalue > self.recovery_threshold
    }
}

/// Fold `v` into `dimension` components by summing indices modulo the
/// dimension. Shorter vectors are zero-padded.
pub fn fold_embedding(v: &[f64], dimension: usize) -> Vec<f64> {
    let dimension = dimension.max(1);
    let mut out = vec![0.0; dimension];
    for (i, x) in v.iter().enumerate() {
        out[i % dimension] += x;
    }
    out
}

/// Min and max eigenvalue of the sample covariance (denominator n-1).
///
/// `None` with fewer than two samples.
pub fn covariance_eigen_range(samples: &[Vec<f64>]) -> Option<(f64, f64)> {
    let n = samples.len();
    if n < 2 {
        return None;
    }
    let d = samples.iter().map(Vec::len).max().unwrap_or(0);
    if d == 0 {
        return Some((0.0, 0.0));
    }

    let data = DMatrix::from_fn(n, d, |i, j| samples[i].get(j).copied().unwrap_or(0.0));
    let means: Vec<f64> = (0..d).map(|j| data.column(j).sum() / n as f64).collect();
    let centered = DMatrix::from_fn(n, d, |i, j| data[(i, j)] - means[j]);
    let covariance = (centered.transpose() * &centered) / (n as f64 - 1.0);

    let eigen = SymmetricEigen::new(covariance);
    let (min, max) = eigen
        .eigenvalues
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    // Round-off can push a zero eigenvalue slightly negative.
    Some((min.max(0.0), max.max(0.0)))
}

/// `max |dc| / |de|` over all pairs, floored at [`MIN_LIPSCHITZ`].
///
/// Confidence is on [0, 1]. Pairs at near-zero distance are skipped.
pub fn estimate_lipschitz(embeddings: &[Vec<f64>], confidences: &[f64]) -> f64 {
    let n = embeddings.len().min(confidences.len());
    let mut best = 0.0f64;
    for i in 0..n {
        for j in (i + 1)..n {
            let distance = euclidean_distance(&embeddings[i], &embeddings[j]);
            if distance < MIN_PAIR_DISTANCE {
                continue;
            }
            let ratio = (confidences[i] - confidences[j]).abs() / distance;
            if ratio.is_finite() {
                best = best.max(ratio);
            }
        }
    }
    best.max(MIN_LIPSCHITZ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_sums_modulo_dimension() {
        assert_eq!(fold_embedding(&[1.0, 2.0, 3.0, 4.0, 5.0], 2), vec![9.0, 6.0]);
        assert_eq!(fold_embedding(&[1.0], 3), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn identical_samples_have_zero_spectrum() {
        let samples = vec![vec![1.0, 2.0, 3.0]; 5];
        let (min, max) = covariance_eigen_range(&samples).unwrap();
        assert!(min.abs() < 1e-12);
        assert!(max.abs() < 1e-12);
    }

    #[test]
    fn axis_samples_have_known_spectrum() {
        // Variance 1/2 on each axis for {e1, -e1, e2, -e2} with n-1 = 3.
        let samples = vec![
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, -1.0],
        ];
        let (min, max) = covariance_eigen_range(&samples).unwrap();
        assert!((min - 2.0 / 3.0).abs() < 1e-9);
        assert!((max - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn single_sample_has_no_reading() {
        assert!(covariance_eigen_range(&[vec![1.0, 0.0]]).is_none());
    }

    #[test]
    fn lipschitz_estimate() {
        let embeddings = vec![vec![0.0, 0.0], vec![0.5, 0.0]];
        assert!((estimate_lipschitz(&embeddings, &[0.0, 1.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn lipschitz_floor_and_skip() {
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        assert_eq!(estimate_lipschitz(&embeddings, &[0.0, 1.0]), MIN_LIPSCHITZ);
        let spread = vec![vec![0.0], vec![10.0]];
        assert_eq!(estimate_lipschitz(&spread, &[0.5, 0.5]), MIN_LIPSCHITZ);
    }
}
