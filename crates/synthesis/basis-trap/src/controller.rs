use crate::config::BasisTrapConfig;
use crate::spectral::{covariance_eigen_range, estimate_lipschitz, fold_embedding, SpectralReading};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use synthesis_oracle::{embed_or_neutral, EmbeddingService};
use synthesis_types::{CancellationFlag, Hypothesis};
use tracing::{debug, info, warn};

const MAX_READING_HISTORY: usize = 64;

/// Controller mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TrapMode {
    Normal,
    /// `cooldown` counts consecutive recovered readings.
    Expanding { cooldown: u32 },
}

impl TrapMode {
    pub fn is_expanding(&self) -> bool {
        matches!(self, TrapMode::Expanding { .. })
    }
}

/// Request for one high-temperature exploration burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionDirective {
    pub temperature: f64,
    pub burst_samples: usize,
    pub spectral_gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapEvaluation {
    /// `None` when the window held fewer than two samples.
    pub reading: Option<SpectralReading>,
    /// Set only on the transition into `Expanding`.
    pub directive: Option<ExpansionDirective>,
    pub mode: TrapMode,
}

pub struct BasisTrapController {
    config: BasisTrapConfig,
    embedder: Arc<dyn EmbeddingService>,
    mode: TrapMode,
    history: VecDeque<SpectralReading>,
    escalations: u32,
    cancel: CancellationFlag,
}

impl BasisTrapController {
    pub fn new(config: BasisTrapConfig, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            config,
            embedder,
            mode: TrapMode::Normal,
            history: VecDeque::with_capacity(MAX_READING_HISTORY),
            escalations: 0,
            cancel: CancellationFlag::new(),
        }
    }

    /// Stop embedding once `cancel` is set.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &BasisTrapConfig {
        &self.config
    }

    pub fn mode(&self) -> TrapMode {
        self.mode
    }

    /// Number of directives issued so far.
    pub fn escalations(&self) -> u32 {
        self.escalations
    }

    pub fn history(&self) -> impl Iterator<Item = &SpectralReading> {
        self.history.iter()
    }

    /// Temperature the explorer should use right now.
    pub fn current_temperature(&self, baseline: f64) -> f64 {
        if self.mode.is_expanding() {
            self.config.expansion_temperature
        } else {
            baseline
        }
    }

    /// Embed the last `window_size` hypotheses and evaluate them.
    ///
    /// Embedding failures degrade to zero vectors. A cancelled run yields
    /// no reading and leaves the mode untouched.
    pub async fn evaluate(&mut self, hypotheses: &[Hypothesis]) -> TrapEvaluation {
        let samples = embed_window(
            self.embedder.as_ref(),
            hypotheses,
            self.config.window_size,
            &self.cancel,
        )
        .await;
        self.evaluate_samples(&samples, None)
    }

    /// Evaluate `(embedding, confidence in [0, 1])` samples.
    ///
    /// `lipschitz_override` replaces the estimate from the samples.
    pub fn evaluate_samples(
        &mut self,
        samples: &[(Vec<f64>, f64)],
        lipschitz_override: Option<f64>,
    ) -> TrapEvaluation {
        let start = samples.len().saturating_sub(self.config.window_size);
        let window = &samples[start..];
        let folded: Vec<Vec<f64>> = window
            .iter()
            .map(|(v, _)| fold_embedding(v, self.config.dimension))
            .collect();
        let confidences: Vec<f64> = window.iter().map(|(_, c)| *c).collect();

        let Some((min_eigenvalue, max_eigenvalue)) = covariance_eigen_range(&folded) else {
            debug!(samples = window.len(), "not enough samples for a spectral reading");
            return TrapEvaluation {
                reading: None,
                directive: None,
                mode: self.mode,
            };
        };

        let lipschitz = lipschitz_override
            .filter(|l| l.is_finite() && *l > 0.0)
            .unwrap_or_else(|| estimate_lipschitz(&folded, &confidences));
        let root = lipschitz.sqrt();
        let reading = SpectralReading {
            sample_count: window.len(),
            min_eigenvalue,
            max_eigenvalue,
            lipschitz,
            trigger_threshold: self.config.threshold_multiplier / root,
            recovery_threshold: self.config.recovery_multiplier / root,
        };

        let directive = self.transition(&reading);

        if self.history.len() == MAX_READING_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(reading.clone());

        TrapEvaluation {
            reading: Some(reading),
            directive,
            mode: self.mode,
        }
    }

    fn transition(&mut self, reading: &SpectralReading) -> Option<ExpansionDirective> {
        match self.mode {
            TrapMode::Normal => {
                if !reading.is_trapped() {
                    return None;
                }
                warn!(
                    spectral_gap = reading.min_eigenvalue,
                    threshold = reading.trigger_threshold,
                    lipschitz = reading.lipschitz,
                    "basis trap detected, expanding exploration"
                );
                self.mode = TrapMode::Expanding { cooldown: 0 };
                self.escalations += 1;
                Some(ExpansionDirective {
                    temperature: self.config.expansion_temperature,
                    burst_samples: self.config.burst_samples,
                    spectral_gap: reading.min_eigenvalue,
                })
            }
            TrapMode::Expanding { cooldown } => {
                if reading.is_recovered() {
                    let cooldown = cooldown + 1;
                    if cooldown >= self.config.cooldown_period {
                        info!(
                            spectral_gap = reading.min_eigenvalue,
                            "exploration recovered, returning to normal temperature"
                        );
                        self.mode = TrapMode::Normal;
                    } else {
                        self.mode = TrapMode::Expanding { cooldown };
                    }
                } else {
                    self.mode = TrapMode::Expanding { cooldown: 0 };
                }
                None
            }
        }
    }
}

/// Embed the last `window_size` hypotheses as `(vector, confidence in [0, 1])`
/// samples.
///
/// Embedding failures degrade to zero vectors. Once `cancel` is set no
/// further calls are made and the window comes back empty.
pub async fn embed_window(
    embedder: &dyn EmbeddingService,
    hypotheses: &[Hypothesis],
    window_size: usize,
    cancel: &CancellationFlag,
) -> Vec<(Vec<f64>, f64)> {
    let start = hypotheses.len().saturating_sub(window_size);
    let mut samples = Vec::with_capacity(hypotheses.len() - start);
    for hypothesis in &hypotheses[start..] {
        if cancel.is_cancelled() {
            debug!("cancelled while embedding the trap window");
            return Vec::new();
        }
        let text = format!("{} {}", hypothesis.thesis, hypothesis.mechanism);
        let vector = embed_or_neutral(embedder, &text).await;
        samples.push((vector, hypothesis.confidence / 100.0));
    }
    samples
}
