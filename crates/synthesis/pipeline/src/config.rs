use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use synthesis_audit::{AuditConfig, ResearchDomain};
use synthesis_basis_trap::BasisTrapConfig;
use synthesis_calibrator::CalibrationConfig;
use synthesis_envelope::RetryConfig;
use synthesis_explorer::McmcConfig;
use synthesis_novelty::NoveltyConfig;
use synthesis_telemetry::TracingConfig;

/// Full orchestrator configuration.
///
/// Every field is optional in TOML:
///
/// ```toml
/// max_refinement_iterations = 2
/// parallel_concurrency = 4
/// domain = "legal"
///
/// [mcmc]
/// num_samples = 30
/// seed = 7
///
/// [retry]
/// base_delay_ms = 250
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_refinement_iterations: u32,
    /// Base radius for folding rejections into a class.
    pub novelty_threshold: f64,
    pub parallel_concurrency: usize,
    pub domain: Option<ResearchDomain>,
    /// Output dimension of the default embedder.
    pub embedding_dimension: usize,
    pub mcmc: McmcConfig,
    pub retry: RetryConfig,
    pub basis_trap: BasisTrapConfig,
    pub calibration: CalibrationConfig,
    /// Membership tolerances; its `novelty_threshold` is replaced by the
    /// top-level value.
    pub novelty: NoveltyConfig,
    pub tracing: TracingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_refinement_iterations: 3,
            novelty_threshold: 0.25,
            parallel_concurrency: 3,
            domain: None,
            embedding_dimension: 64,
            mcmc: McmcConfig::default(),
            retry: RetryConfig::default(),
            basis_trap: BasisTrapConfig::default(),
            calibration: CalibrationConfig::default(),
            novelty: NoveltyConfig::default(),
            tracing: TracingConfig::default(),
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn positive_finite(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and positive, got {}", value)))
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_max_refinement_iterations(mut self, iterations: u32) -> Self {
        self.max_refinement_iterations = iterations;
        self
    }

    pub fn with_parallel_concurrency(mut self, concurrency: usize) -> Self {
        self.parallel_concurrency = concurrency;
        self
    }

    pub fn with_domain(mut self, domain: ResearchDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_mcmc(mut self, mcmc: McmcConfig) -> Self {
        self.mcmc = mcmc;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_basis_trap(mut self, basis_trap: BasisTrapConfig) -> Self {
        self.basis_trap = basis_trap;
        self
    }

    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig {
            max_refinement_iterations: self.max_refinement_iterations,
            parallel_concurrency: self.parallel_concurrency,
            domain: self.domain,
            ..AuditConfig::default()
        }
    }

    pub fn novelty_config(&self) -> NoveltyConfig {
        self.novelty.clone().with_threshold(self.novelty_threshold)
    }

    /// Reject bounds the components cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_refinement_iterations == 0 {
            return Err(invalid("max_refinement_iterations", "must be at least 1"));
        }
        if self.parallel_concurrency == 0 {
            return Err(invalid("parallel_concurrency", "must be at least 1"));
        }
        if !(self.novelty_threshold.is_finite() && self.novelty_threshold > 0.0 && self.novelty_threshold <= 2.0) {
            return Err(invalid("novelty_threshold", "must be in (0, 2]"));
        }
        if self.embedding_dimension == 0 {
            return Err(invalid("embedding_dimension", "must be at least 1"));
        }

        let mcmc = &self.mcmc;
        if mcmc.num_samples == 0 {
            return Err(invalid("mcmc.num_samples", "must be at least 1"));
        }
        if mcmc.burn_in >= mcmc.num_samples {
            return Err(invalid(
                "mcmc.burn_in",
                format!("must be below num_samples ({})", mcmc.num_samples),
            ));
        }
        positive_finite("mcmc.temperature", mcmc.temperature)?;
        if mcmc.max_concepts_per_proposal == 0 {
            return Err(invalid("mcmc.max_concepts_per_proposal", "must be at least 1"));
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err(invalid("retry.base_delay_ms", "must not exceed max_delay_ms"));
        }
        if !(0.0..=1.0).contains(&retry.jitter_factor) {
            return Err(invalid("retry.jitter_factor", "must be in [0, 1]"));
        }
        if retry.call_timeout_ms == 0 {
            return Err(invalid("retry.call_timeout_ms", "must be positive"));
        }

        let trap = &self.basis_trap;
        if trap.window_size < 2 {
            return Err(invalid("basis_trap.window_size", "must be at least 2"));
        }
        if trap.dimension == 0 {
            return Err(invalid("basis_trap.dimension", "must be at least 1"));
        }
        positive_finite("basis_trap.threshold_multiplier", trap.threshold_multiplier)?;
        positive_finite("basis_trap.recovery_multiplier", trap.recovery_multiplier)?;
        positive_finite("basis_trap.expansion_temperature", trap.expansion_temperature)?;
        if trap.cooldown_period == 0 {
            return Err(invalid("basis_trap.cooldown_period", "must be at least 1"));
        }

        if !self.calibration.weights.is_valid() {
            return Err(invalid("calibration.weights", "must be non-negative with a positive sum"));
        }
        positive_finite("calibration.log_concave_multiplier", self.calibration.log_concave_multiplier)?;
        positive_finite(
            "calibration.non_log_concave_multiplier",
            self.calibration.non_log_concave_multiplier,
        )?;

        positive_finite("novelty.radius_buffer", self.novelty.radius_buffer)?;
        positive_finite("novelty.min_membership_radius", self.novelty.min_membership_radius)?;
        Ok(())
    }
}
