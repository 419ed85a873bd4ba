use async_trait::async_trait;
use std::sync::Arc;
use synthesis_oracle::{embed_or_neutral, EmbeddingService};
use synthesis_store::{EmbeddingKind, HypothesisStore};
use synthesis_types::{
    is_zero_vector, CalibrationFactors, CancellationFlag, Concept, Contradiction, Hypothesis, HypothesisId,
};
use tracing::warn;

/// Value used when a signal cannot be measured.
pub const NEUTRAL_FACTOR: f64 = 0.5;
/// Prior-art neighbours consulted per calibration.
const PRIOR_ART_NEIGHBOURS: usize = 8;
/// Mechanism steps that count as full evidence depth.
const FULL_DEPTH_STEPS: f64 = 4.0;
/// Bridged concepts that count as a full-strength bridge.
const FULL_BRIDGE_CONCEPTS: f64 = 3.0;

/// Read-only run context shared by every audit worker.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub source_count: usize,
    pub concepts: Vec<Concept>,
    pub contradictions: Vec<Contradiction>,
}

impl AuditContext {
    pub fn new(source_count: usize, concepts: Vec<Concept>, contradictions: Vec<Contradiction>) -> Self {
        Self {
            source_count,
            concepts,
            contradictions,
        }
    }
}

/// Produces the calibration factors for a hypothesis.
///
/// `lineage` holds the ids of every version of the hypothesis so far, which
/// are not prior art for each other.
#[async_trait]
pub trait FactorSource: Send + Sync {
    async fn factors(
        &self,
        hypothesis: &Hypothesis,
        lineage: &[HypothesisId],
        context: &AuditContext,
    ) -> CalibrationFactors;
}

/// Derives factors from provenance, contradictions, mechanism depth and
/// similarity to persisted candidates.
///
/// Once the cancellation flag is set the embedder and store are no longer
/// called and prior-art distance reads as neutral.
pub struct SignalFactorSource {
    embedder: Arc<dyn EmbeddingService>,
    store: Option<Arc<dyn HypothesisStore>>,
    cancel: CancellationFlag,
}

impl SignalFactorSource {
    pub fn new(embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            embedder,
            store: None,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn HypothesisStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    async fn prior_art_distance(&self, hypothesis: &Hypothesis, lineage: &[HypothesisId]) -> f64 {
        let Some(store) = &self.store else {
            return NEUTRAL_FACTOR;
        };
        if self.cancel.is_cancelled() {
            return NEUTRAL_FACTOR;
        }
        let text = format!("{} {}", hypothesis.thesis, hypothesis.mechanism);
        let vector = embed_or_neutral(self.embedder.as_ref(), &text).await;
        if is_zero_vector(&vector) || self.cancel.is_cancelled() {
            return NEUTRAL_FACTOR;
        }

        let limit = PRIOR_ART_NEIGHBOURS + lineage.len() + 1;
        match store
            .match_embeddings(EmbeddingKind::Candidate, &vector, -1.0, limit)
            .await
        {
            Ok(matches) => {
                let best = matches
                    .iter()
                    .filter(|m| m.record.hypothesis_id != hypothesis.id)
                    .filter(|m| !lineage.contains(&m.record.hypothesis_id))
                    .map(|m| m.similarity)
                    .fold(0.0f64, f64::max);
                1.0 - best
            }
            Err(e) => {
                warn!(error = %e, hypothesis_id = %hypothesis.id, "prior-art lookup failed, using neutral factor");
                NEUTRAL_FACTOR
            }
        }
    }
}

/// Share of the run's sources the hypothesis draws on.
pub fn source_agreement(hypothesis: &Hypothesis, context: &AuditContext) -> f64 {
    if context.source_count == 0 {
        return NEUTRAL_FACTOR;
    }
    (hypothesis.provenance.source_ids.len() as f64 / context.source_count as f64).min(1.0)
}

/// How many of the contradictions a hypothesis touches it also spans.
///
/// A contradiction is spanned when the hypothesis bridges at least two of
/// its concepts. Neutral when it touches none.
pub fn contradiction_resolution(hypothesis: &Hypothesis, context: &AuditContext) -> f64 {
    let concept_ids = &hypothesis.provenance.concept_ids;
    let mut touched = 0usize;
    let mut spanned = 0usize;
    for contradiction in &context.contradictions {
        let hits = concept_ids
            .iter()
            .filter(|id| contradiction.involves(id))
            .count();
        if hits > 0 {
            touched += 1;
        }
        if hits >= 2 {
            spanned += 1;
        }
    }
    if touched == 0 {
        NEUTRAL_FACTOR
    } else {
        0.4 + 0.6 * spanned as f64 / touched as f64
    }
}

/// Number of mechanism steps, saturating at four.
pub fn evidence_depth(hypothesis: &Hypothesis) -> f64 {
    let steps = hypothesis
        .mechanism
        .split(['.', ';', '\n'])
        .filter(|s| s.trim().len() > 2)
        .count();
    (steps as f64 / FULL_DEPTH_STEPS).min(1.0)
}

pub fn concept_bridge_strength(hypothesis: &Hypothesis) -> f64 {
    (hypothesis.bridge_count() as f64 / FULL_BRIDGE_CONCEPTS).min(1.0)
}

#[async_trait]
impl FactorSource for SignalFactorSource {
    async fn factors(
        &self,
        hypothesis: &Hypothesis,
        lineage: &[HypothesisId],
        context: &AuditContext,
    ) -> CalibrationFactors {
        CalibrationFactors::new(
            source_agreement(hypothesis, context),
            self.prior_art_distance(hypothesis, lineage).await,
            contradiction_resolution(hypothesis, context),
            evidence_depth(hypothesis),
            concept_bridge_strength(hypothesis),
        )
    }
}
