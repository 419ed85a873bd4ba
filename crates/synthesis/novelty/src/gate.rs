use crate::config::NoveltyConfig;
use crate::error::NoveltyError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use synthesis_store::{EmbeddingKind, EmbeddingRecord, HypothesisStore};
use synthesis_types::{is_zero_vector, ClassId, EquivalenceClass, HypothesisId};
use tracing::{debug, info, warn};

/// A candidate that fell inside a rejected class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenMatch {
    pub class_id: ClassId,
    pub member_count: usize,
    pub reason: String,
    pub distance: f64,
}

/// Online clustering of rejected hypotheses.
pub struct NoveltyGate {
    config: NoveltyConfig,
    classes: RwLock<Vec<EquivalenceClass>>,
    store: Option<Arc<dyn HypothesisStore>>,
    warned_no_store: AtomicBool,
}

impl NoveltyGate {
    pub fn new(config: NoveltyConfig) -> Self {
        Self {
            config,
            classes: RwLock::new(Vec::new()),
            store: None,
            warned_no_store: AtomicBool::new(false),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn HypothesisStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &NoveltyConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<EquivalenceClass>>, NoveltyError> {
        self.classes.read().map_err(|_| NoveltyError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<EquivalenceClass>>, NoveltyError> {
        self.classes.write().map_err(|_| NoveltyError::LockPoisoned)
    }

    fn warn_disabled(&self) {
        if !self.warned_no_store.swap(true, Ordering::Relaxed) {
            warn!("no hypothesis store configured, novelty gate passes every candidate");
        }
    }

    pub fn classes(&self) -> Result<Vec<EquivalenceClass>, NoveltyError> {
        Ok(self.read()?.clone())
    }

    pub fn class_count(&self) -> Result<usize, NoveltyError> {
        Ok(self.read()?.len())
    }

    /// Nearest class whose membership radius contains `embedding`.
    pub fn check(&self, embedding: &[f64]) -> Result<Option<ForbiddenMatch>, NoveltyError> {
        if !self.is_enabled() {
            self.warn_disabled();
            return Ok(None);
        }
        if is_zero_vector(embedding) {
            return Ok(None);
        }

        let classes = self.read()?;
        let hit = classes
            .iter()
            .map(|c| (c, c.distance_to(embedding)))
            .filter(|(c, d)| *d <= self.config.membership_radius(c.radius))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(c, d)| ForbiddenMatch {
                class_id: c.id,
                member_count: c.member_count,
                reason: c.representative_reason.clone(),
                distance: d,
            });
        Ok(hit)
    }

    /// Persist a rejection and fold it into the class table.
    ///
    /// Returns the class it joined or created, `None` when the gate is
    /// disabled or the embedding carries no signal.
    pub async fn record_rejection(
        &self,
        hypothesis_id: HypothesisId,
        embedding: Vec<f64>,
        reason: impl Into<String>,
    ) -> Result<Option<ClassId>, NoveltyError> {
        let Some(store) = &self.store else {
            self.warn_disabled();
            return Ok(None);
        };
        if is_zero_vector(&embedding) {
            debug!(hypothesis_id = %hypothesis_id, "skipping rejection without embedding");
            return Ok(None);
        }
        let reason = reason.into();

        store
            .put_embedding(EmbeddingRecord {
                hypothesis_id,
                kind: EmbeddingKind::Rejected,
                vector: embedding.clone(),
                reason: reason.clone(),
            })
            .await?;

        let mut classes = self.write()?;
        Ok(Some(self.fold(&mut classes, &embedding, reason)))
    }

    fn fold(&self, classes: &mut Vec<EquivalenceClass>, embedding: &[f64], reason: String) -> ClassId {
        let nearest = classes
            .iter_mut()
            .map(|c| {
                let d = c.distance_to(embedding);
                (c, d)
            })
            .filter(|(_, d)| *d <= self.config.novelty_threshold)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match nearest {
            Some((class, distance)) => {
                class.absorb(embedding);
                debug!(class_id = %class.id, members = class.member_count, distance = distance, "rejection joined class");
                class.id
            }
            None => {
                let class = EquivalenceClass::singleton(embedding.to_vec(), reason);
                let id = class.id;
                debug!(class_id = %id, "new equivalence class");
                classes.push(class);
                id
            }
        }
    }

    /// Rebuild the class table from persisted rejections.
    pub async fn hydrate(&self) -> Result<usize, NoveltyError> {
        let Some(store) = &self.store else {
            self.warn_disabled();
            return Ok(0);
        };
        let records = store.embeddings_of_kind(EmbeddingKind::Rejected).await?;

        let mut rebuilt = Vec::new();
        for record in records {
            if is_zero_vector(&record.vector) {
                continue;
            }
            self.fold(&mut rebuilt, &record.vector, record.reason);
        }
        let count = rebuilt.len();
        *self.write()? = rebuilt;
        info!(classes = count, "novelty gate hydrated");
        Ok(count)
    }
}
