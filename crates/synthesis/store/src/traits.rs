use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use synthesis_types::{AuditVerdict, Hypothesis, HypothesisId};

/// Why an embedding was stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    /// Explored candidate, used as prior art for later calibration.
    Candidate,
    /// Independently rejected by the audit loop, feeds the novelty gate.
    Rejected,
}

/// A stored embedding vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub hypothesis_id: HypothesisId,
    pub kind: EmbeddingKind,
    pub vector: Vec<f64>,
    /// Rejection reason or candidate thesis.
    pub reason: String,
}

/// A similarity search hit.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingMatch {
    pub record: EmbeddingRecord,
    /// Cosine similarity in [-1, 1].
    pub similarity: f64,
}

/// Pluggable persistence backend.
#[async_trait]
pub trait HypothesisStore: Send + Sync {
    /// Persist a hypothesis. Fails if the id already exists.
    async fn put_hypothesis(&self, hypothesis: &Hypothesis) -> Result<(), StoreError>;

    async fn get_hypothesis(&self, id: &HypothesisId) -> Result<Option<Hypothesis>, StoreError>;

    async fn put_verdict(&self, verdict: &AuditVerdict) -> Result<(), StoreError>;

    /// Verdicts for one hypothesis in iteration order.
    async fn verdicts_for(&self, id: &HypothesisId) -> Result<Vec<AuditVerdict>, StoreError>;

    async fn put_embedding(&self, record: EmbeddingRecord) -> Result<(), StoreError>;

    /// Embeddings of `kind` with cosine similarity at least `threshold`,
    /// best first, at most `limit`.
    async fn match_embeddings(
        &self,
        kind: EmbeddingKind,
        vector: &[f64],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<EmbeddingMatch>, StoreError>;

    async fn embeddings_of_kind(&self, kind: EmbeddingKind) -> Result<Vec<EmbeddingRecord>, StoreError>;
}
