use serde::{Deserialize, Serialize};

/// Basis-trap detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasisTrapConfig {
    /// Most recent hypotheses considered per evaluation.
    pub window_size: usize,
    /// Embedding dimension after folding.
    pub dimension: usize,
    /// Trigger when `lambda_min < threshold_multiplier / sqrt(L)`.
    pub threshold_multiplier: f64,
    /// Readings above `recovery_multiplier / sqrt(L)` count toward recovery.
    pub recovery_multiplier: f64,
    /// Temperature used while expanding.
    pub expansion_temperature: f64,
    /// Consecutive recovered readings needed to return to normal.
    pub cooldown_period: u32,
    /// Chain length of one expansion burst.
    pub burst_samples: usize,
}

impl Default for BasisTrapConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            dimension: 8,
            threshold_multiplier: 0.05,
            recovery_multiplier: 0.075,
            expansion_temperature: 1.5,
            cooldown_period: 3,
            burst_samples: 10,
        }
    }
}

impl BasisTrapConfig {
    pub fn with_window(mut self, window_size: usize, dimension: usize) -> Self {
        self.window_size = window_size;
        self.dimension = dimension;
        self
    }

    pub fn with_multipliers(mut self, threshold: f64, recovery: f64) -> Self {
        self.threshold_multiplier = threshold;
        self.recovery_multiplier = recovery;
        self
    }

    pub fn with_expansion(mut self, temperature: f64, burst_samples: usize) -> Self {
        self.expansion_temperature = temperature;
        self.burst_samples = burst_samples;
        self
    }

    pub fn with_cooldown_period(mut self, period: u32) -> Self {
        self.cooldown_period = period;
        self
    }
}
