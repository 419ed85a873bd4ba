use serde::{Deserialize, Serialize};

/// Sampler parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McmcConfig {
    /// Chain length.
    pub num_samples: usize,
    /// Leading steps whose states are discarded.
    pub burn_in: usize,
    /// Baseline temperature.
    pub temperature: f64,
    /// Upper bound on concepts recombined by one proposal.
    pub max_concepts_per_proposal: usize,
    /// Fixed RNG seed for reproducible chains.
    pub seed: Option<u64>,
}

impl Default for McmcConfig {
    fn default() -> Self {
        Self {
            num_samples: 20,
            burn_in: 5,
            temperature: 0.6,
            max_concepts_per_proposal: 3,
            seed: None,
        }
    }
}

impl McmcConfig {
    pub fn with_samples(mut self, num_samples: usize, burn_in: usize) -> Self {
        self.num_samples = num_samples;
        self.burn_in = burn_in;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_concepts(mut self, max: usize) -> Self {
        self.max_concepts_per_proposal = max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
