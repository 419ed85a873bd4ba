use crate::weights::CalibrationWeights;
use serde::{Deserialize, Serialize};
use synthesis_types::{CalibrationFactors, FactorKind};
use tracing::debug;

/// Floor applied to factor values before taking logarithms.
const LOG_EPSILON: f64 = 1e-9;

/// Calibration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub weights: CalibrationWeights,
    /// Applied when the sorted factor profile is log-concave.
    pub log_concave_multiplier: f64,
    /// Applied otherwise.
    pub non_log_concave_multiplier: f64,
    /// Factors at or above this are called out as strong.
    pub strong_threshold: f64,
    /// Factors at or below this are called out as weak.
    pub weak_threshold: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            weights: CalibrationWeights::default(),
            log_concave_multiplier: 1.05,
            non_log_concave_multiplier: 0.90,
            strong_threshold: 0.80,
            weak_threshold: 0.30,
        }
    }
}

impl CalibrationConfig {
    pub fn with_weights(mut self, weights: CalibrationWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_multipliers(mut self, log_concave: f64, non_log_concave: f64) -> Self {
        self.log_concave_multiplier = log_concave;
        self.non_log_concave_multiplier = non_log_concave;
        self
    }
}

/// Result of calibrating one factor set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    /// Integer confidence in [0, 100].
    pub score: u32,
    pub geometric_mean: f64,
    pub log_concave: bool,
    pub multiplier: f64,
    pub rationale: String,
    /// The clamped factors the score was computed from.
    pub factors: CalibrationFactors,
}

impl CalibrationOutcome {
    pub fn confidence(&self) -> f64 {
        self.score as f64
    }
}

/// Weighted geometric-mean calibrator.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceCalibrator {
    config: CalibrationConfig,
}

impl ConfidenceCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Calibrate a factor set. Factors are clamped to [0,1] first.
    pub fn calibrate(&self, factors: &CalibrationFactors) -> CalibrationOutcome {
        let factors = factors.clamped();
        let weights = if self.config.weights.is_valid() {
            self.config.weights
        } else {
            CalibrationWeights::default()
        };

        let geometric_mean = weighted_geometric_mean(&weights, &factors);
        let log_concave = is_log_concave(&factors.as_array());
        let multiplier = if log_concave {
            self.config.log_concave_multiplier
        } else {
            self.config.non_log_concave_multiplier
        };

        let scaled = (geometric_mean * multiplier).clamp(0.0, 1.0);
        let score = if scaled.is_finite() {
            (scaled * 100.0).round() as u32
        } else {
            0
        };
        let rationale = self.rationale(&factors, log_concave, multiplier, score);

        debug!(score = score, geometric_mean = geometric_mean, log_concave = log_concave, "calibrated confidence");

        CalibrationOutcome {
            score,
            geometric_mean,
            log_concave,
            multiplier,
            rationale,
            factors,
        }
    }

    fn rationale(
        &self,
        factors: &CalibrationFactors,
        log_concave: bool,
        multiplier: f64,
        score: u32,
    ) -> String {
        let describe = |kinds: Vec<(FactorKind, f64)>| {
            kinds
                .iter()
                .map(|(k, v)| format!("{} ({:.2})", k, v))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let strong: Vec<_> = factors
            .iter()
            .filter(|(_, v)| *v >= self.config.strong_threshold)
            .collect();
        let weak: Vec<_> = factors
            .iter()
            .filter(|(_, v)| *v <= self.config.weak_threshold)
            .collect();

        let mut parts = vec![format!("Confidence {}/100.", score)];
        if !strong.is_empty() {
            parts.push(format!("Strong: {}.", describe(strong)));
        }
        if !weak.is_empty() {
            parts.push(format!("Weak: {}.", describe(weak)));
        }
        let shape = if log_concave {
            "balanced (log-concave)"
        } else {
            "uneven (not log-concave)"
        };
        parts.push(format!("Factor profile is {}, x{:.2}.", shape, multiplier));
        parts.join(" ")
    }
}

/// `exp(sum(w * ln(max(v, eps))) / sum(w))`.
pub fn weighted_geometric_mean(weights: &CalibrationWeights, factors: &CalibrationFactors) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    let log_sum: f64 = weights
        .pair_with(factors)
        .iter()
        .map(|(w, v)| w * v.max(LOG_EPSILON).ln())
        .sum();
    (log_sum / total).exp()
}

/// `v[i]^2 >= v[i-1] * v[i+1]` for every interior index of the
/// ascending-sorted values.
pub fn is_log_concave(values: &[f64]) -> bool {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
        .windows(3)
        .all(|w| w[1] * w[1] + 1e-12 >= w[0] * w[2])
}
