//! Shared fixtures for the end-to-end and property suites.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synthesis_envelope::{OracleRoute, RetryConfig};
use synthesis_oracle::{EmbeddingService, GenerativeOracle, HashEmbedder, OracleError};
use synthesis_pipeline::{PipelineBuilder, PipelineConfig, PipelineError, SynthesisPipeline};
use synthesis_store::InMemoryHypothesisStore;
use synthesis_types::SourceDocument;

/// Three short documents on one theme.
pub fn three_sources() -> Vec<SourceDocument> {
    vec![
        SourceDocument::new(
            "s1",
            "Sleep spindles and memory",
            "Thalamocortical spindles gate hippocampal replay during NREM sleep.",
        ),
        SourceDocument::new(
            "s2",
            "Synaptic homeostasis",
            "Slow-wave sleep downscales synaptic strength accumulated while awake.",
        ),
        SourceDocument::new(
            "s3",
            "Targeted memory reactivation",
            "Cueing learned associations during sleep improves next-day recall.",
        ),
    ]
}

/// Small, seeded configuration with millisecond backoff.
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default()
        .with_retry(RetryConfig::default().with_delays(1, 4).with_call_timeout_ms(5_000));
    config.mcmc = config.mcmc.with_samples(8, 2).with_seed(42);
    config
}

/// Builder over `oracle` with the route name `"primary"`.
pub fn builder(config: PipelineConfig, oracle: Arc<dyn GenerativeOracle>) -> PipelineBuilder {
    SynthesisPipeline::builder(config, OracleRoute::new("primary", oracle))
}

/// Pipeline backed by a fresh in-memory store.
pub fn pipeline_with_store(
    config: PipelineConfig,
    oracle: Arc<dyn GenerativeOracle>,
) -> Result<(SynthesisPipeline, Arc<InMemoryHypothesisStore>), PipelineError> {
    let store = Arc::new(InMemoryHypothesisStore::new());
    let pipeline = builder(config, oracle).with_store(store.clone()).build()?;
    Ok((pipeline, store))
}

/// Hash embedder that sleeps before answering.
pub struct SlowEmbedder {
    inner: HashEmbedder,
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowEmbedder {
    pub fn new(dimension: usize, delay: Duration) -> Self {
        Self {
            inner: HashEmbedder::new(dimension),
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingService for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.inner.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

/// Eight-dimensional embedder that ignores its input.
///
/// Collapsed, every text maps to the same vector. Dispersed, calls cycle
/// through the origin and the eight scaled unit axes, so any ten
/// consecutive calls have a full-rank covariance.
pub struct SwitchableEmbedder {
    collapsed: AtomicBool,
    counter: AtomicUsize,
}

impl SwitchableEmbedder {
    pub const DIMENSION: usize = 8;

    pub fn collapsed() -> Self {
        Self {
            collapsed: AtomicBool::new(true),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn dispersed() -> Self {
        let embedder = Self::collapsed();
        embedder.disperse();
        embedder
    }

    pub fn disperse(&self) {
        self.collapsed.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingService for SwitchableEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f64>, OracleError> {
        if self.collapsed.load(Ordering::SeqCst) {
            return Ok(vec![1.0; Self::DIMENSION]);
        }
        let mut vector = vec![0.0; Self::DIMENSION];
        let slot = self.counter.fetch_add(1, Ordering::SeqCst) % (Self::DIMENSION + 1);
        if slot > 0 {
            vector[slot - 1] = 10.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        Self::DIMENSION
    }
}
