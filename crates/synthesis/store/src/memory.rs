use crate::error::StoreError;
use crate::traits::{EmbeddingKind, EmbeddingMatch, EmbeddingRecord, HypothesisStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use synthesis_types::{cosine_similarity, is_zero_vector, AuditVerdict, Hypothesis, HypothesisId};

#[derive(Default)]
struct Tables {
    hypotheses: HashMap<HypothesisId, Hypothesis>,
    verdicts: HashMap<HypothesisId, Vec<AuditVerdict>>,
    embeddings: Vec<EmbeddingRecord>,
}

/// In-memory store for testing and development.
#[derive(Clone, Default)]
pub struct InMemoryHypothesisStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryHypothesisStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
        StoreError::Backend(format!("lock poisoned: {}", e))
    }

    pub fn hypothesis_count(&self) -> Result<usize, StoreError> {
        Ok(self.tables.read().map_err(Self::poisoned)?.hypotheses.len())
    }
}

#[async_trait]
impl HypothesisStore for InMemoryHypothesisStore {
    async fn put_hypothesis(&self, hypothesis: &Hypothesis) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(Self::poisoned)?;
        if tables.hypotheses.contains_key(&hypothesis.id) {
            return Err(StoreError::Conflict(hypothesis.id));
        }
        tables.hypotheses.insert(hypothesis.id, hypothesis.clone());
        Ok(())
    }

    async fn get_hypothesis(&self, id: &HypothesisId) -> Result<Option<Hypothesis>, StoreError> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        Ok(tables.hypotheses.get(id).cloned())
    }

    async fn put_verdict(&self, verdict: &AuditVerdict) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(Self::poisoned)?;
        let list = tables.verdicts.entry(verdict.hypothesis_id).or_default();
        if list.iter().any(|v| v.iteration == verdict.iteration) {
            return Err(StoreError::InvalidRecord(format!(
                "verdict for {} at iteration {} already recorded",
                verdict.hypothesis_id, verdict.iteration
            )));
        }
        list.push(verdict.clone());
        list.sort_by_key(|v| v.iteration);
        Ok(())
    }

    async fn verdicts_for(&self, id: &HypothesisId) -> Result<Vec<AuditVerdict>, StoreError> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        Ok(tables.verdicts.get(id).cloned().unwrap_or_default())
    }

    async fn put_embedding(&self, record: EmbeddingRecord) -> Result<(), StoreError> {
        if record.vector.is_empty() {
            return Err(StoreError::InvalidRecord("empty embedding".into()));
        }
        let mut tables = self.tables.write().map_err(Self::poisoned)?;
        tables.embeddings.push(record);
        Ok(())
    }

    async fn match_embeddings(
        &self,
        kind: EmbeddingKind,
        vector: &[f64],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<EmbeddingMatch>, StoreError> {
        if is_zero_vector(vector) {
            return Ok(Vec::new());
        }
        let tables = self.tables.read().map_err(Self::poisoned)?;
        let mut matches: Vec<EmbeddingMatch> = tables
            .embeddings
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| EmbeddingMatch {
                similarity: cosine_similarity(vector, &r.vector),
                record: r.clone(),
            })
            .filter(|m| m.similarity >= threshold)
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn embeddings_of_kind(&self, kind: EmbeddingKind) -> Result<Vec<EmbeddingRecord>, StoreError> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        Ok(tables
            .embeddings
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }
}
