use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::extraction::{detect_contradictions, extract_concepts};
use crate::result::{rank_outcomes, ForbiddenCandidate, SynthesisResult};
use crate::stage::{Stage, StageTiming};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use synthesis_audit::{
    AuditContext, AuditError, ConcurrencyGauge, FactorSource, RefinementLoop, SignalFactorSource,
};
use synthesis_basis_trap::{embed_window, BasisTrapController, TrapMode};
use synthesis_calibrator::ConfidenceCalibrator;
use synthesis_envelope::{OracleRoute, ProviderHealthRegistry, ResilientEnvelope, RoutedOracle};
use synthesis_explorer::HypothesisExplorer;
use synthesis_novelty::{NoveltyError, NoveltyGate};
use synthesis_oracle::{embed_or_neutral, EmbeddingService, HashEmbedder};
use synthesis_store::{EmbeddingKind, EmbeddingRecord, HypothesisStore, StoreError};
use synthesis_telemetry::{TelemetryBus, TelemetryKind};
use synthesis_types::{CancellationFlag, Concept, Hypothesis, HypothesisId, SourceDocument};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Assembles a [`SynthesisPipeline`] from its collaborators.
pub struct PipelineBuilder {
    config: PipelineConfig,
    primary: OracleRoute,
    secondary: Option<OracleRoute>,
    store: Option<Arc<dyn HypothesisStore>>,
    embedder: Option<Arc<dyn EmbeddingService>>,
    factors: Option<Arc<dyn FactorSource>>,
    telemetry: Option<Arc<TelemetryBus>>,
    cancel: Option<CancellationFlag>,
}

impl PipelineBuilder {
    pub fn with_secondary(mut self, route: OracleRoute) -> Self {
        self.secondary = Some(route);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn HypothesisStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingService>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Replace the default [`SignalFactorSource`].
    pub fn with_factor_source(mut self, factors: Arc<dyn FactorSource>) -> Self {
        self.factors = Some(factors);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryBus>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Validate the configuration and wire the components.
    pub fn build(self) -> Result<SynthesisPipeline> {
        let config = self.config;
        config.validate()?;

        let telemetry = self.telemetry.unwrap_or_else(|| Arc::new(TelemetryBus::new()));
        let cancel = self.cancel.unwrap_or_default();
        let embedder: Arc<dyn EmbeddingService> = match self.embedder {
            Some(embedder) => embedder,
            None => Arc::new(HashEmbedder::new(config.embedding_dimension)),
        };

        let health = Arc::new(ProviderHealthRegistry::new(config.retry.quota_recovery_ms));
        let envelope = Arc::new(
            ResilientEnvelope::new(config.retry.clone(), telemetry.clone(), cancel.clone())
                .with_health(health),
        );
        let mut oracle = RoutedOracle::new(envelope, self.primary);
        if let Some(secondary) = self.secondary {
            oracle = oracle.with_secondary(secondary);
        }

        let factors: Arc<dyn FactorSource> = match self.factors {
            Some(factors) => factors,
            None => {
                let source = SignalFactorSource::new(embedder.clone()).with_cancellation(cancel.clone());
                Arc::new(match &self.store {
                    Some(store) => source.with_store(store.clone()),
                    None => source,
                })
            }
        };

        let mut audit = RefinementLoop::new(oracle.clone(), factors, config.audit_config())
            .with_calibrator(ConfidenceCalibrator::new(config.calibration.clone()));
        let mut gate = NoveltyGate::new(config.novelty_config());
        if let Some(store) = &self.store {
            audit = audit.with_store(store.clone());
            gate = gate.with_store(store.clone());
        } else {
            warn!("no hypothesis store configured, novelty memory and prior-art lookups are disabled");
        }

        let trap = BasisTrapController::new(config.basis_trap.clone(), embedder.clone())
            .with_cancellation(cancel.clone());

        Ok(SynthesisPipeline {
            explorer: HypothesisExplorer::new(oracle.clone(), config.mcmc.clone()),
            trap: Mutex::new(trap),
            oracle,
            audit,
            gate,
            embedder,
            store: self.store,
            telemetry,
            cancel,
            config,
        })
    }
}

/// Sequential stage coordinator.
///
/// Stages: concept extraction, contradiction detection, exploration (with
/// basis-trap escalation), novelty gating, audit and ranking. Cancellation
/// is checked at the start of every stage and by the envelope before every
/// oracle call; a cancelled run returns [`PipelineError::Cancelled`] and no
/// partial result.
///
/// The basis-trap controller outlives a single run: once exploration has
/// escalated, later runs keep sampling at the expansion temperature until
/// the controller reports recovery.
pub struct SynthesisPipeline {
    config: PipelineConfig,
    oracle: RoutedOracle,
    explorer: HypothesisExplorer,
    trap: Mutex<BasisTrapController>,
    audit: RefinementLoop,
    gate: NoveltyGate,
    embedder: Arc<dyn EmbeddingService>,
    store: Option<Arc<dyn HypothesisStore>>,
    telemetry: Arc<TelemetryBus>,
    cancel: CancellationFlag,
}

impl SynthesisPipeline {
    pub fn builder(config: PipelineConfig, primary: OracleRoute) -> PipelineBuilder {
        PipelineBuilder {
            config,
            primary,
            secondary: None,
            store: None,
            embedder: None,
            factors: None,
            telemetry: None,
            cancel: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<TelemetryBus> {
        &self.telemetry
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        info!("cancellation requested");
        self.cancel.cancel();
    }

    pub fn audit_gauge(&self) -> &Arc<ConcurrencyGauge> {
        self.audit.gauge()
    }

    pub fn gate(&self) -> &NoveltyGate {
        &self.gate
    }

    pub fn oracle(&self) -> &RoutedOracle {
        &self.oracle
    }

    /// Current basis-trap mode.
    pub fn trap_mode(&self) -> TrapMode {
        self.trap().mode()
    }

    /// Never held across an await.
    fn trap(&self) -> MutexGuard<'_, BasisTrapController> {
        self.trap.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reload rejected classes persisted by earlier runs.
    pub async fn hydrate_gate(&self) -> std::result::Result<usize, NoveltyError> {
        self.gate.hydrate().await
    }

    fn cancelled(&self, stage: Stage) -> PipelineError {
        info!(stage = %stage, "pipeline cancelled");
        PipelineError::Cancelled { stage }
    }

    fn begin(&self, stage: Stage) -> Result<Instant> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled(stage));
        }
        debug!(stage = %stage, "stage started");
        self.telemetry.emit(stage.as_str(), TelemetryKind::StageStarted);
        Ok(Instant::now())
    }

    fn finish(&self, stage: Stage, started: Instant) -> StageTiming {
        let duration_ms = started.elapsed().as_millis() as u64;
        self.telemetry
            .emit(stage.as_str(), TelemetryKind::StageCompleted { duration_ms });
        debug!(stage = %stage, duration_ms = duration_ms, "stage completed");
        StageTiming {
            stage,
            duration_ms,
            skipped: false,
        }
    }

    fn skip(&self, stage: Stage, reason: &str) -> StageTiming {
        info!(stage = %stage, reason = reason, "stage skipped");
        self.telemetry.emit(
            stage.as_str(),
            TelemetryKind::StageSkipped {
                reason: reason.to_string(),
            },
        );
        StageTiming {
            stage,
            duration_ms: 0,
            skipped: true,
        }
    }

    /// Run every stage over `sources`.
    pub async fn run(&self, sources: &[SourceDocument]) -> Result<SynthesisResult> {
        if sources.is_empty() {
            return Err(PipelineError::NoSources);
        }
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, sources = sources.len(), "synthesis run started");
        let mut timings = Vec::with_capacity(Stage::ALL.len());

        // Concepts.
        let started = self.begin(Stage::ConceptExtraction)?;
        let mut concepts = Vec::new();
        for (i, source) in sources.iter().enumerate() {
            let extracted = extract_concepts(&self.oracle, source)
                .await
                .map_err(|_| self.cancelled(Stage::ConceptExtraction))?;
            concepts.extend(extracted);
            self.telemetry.emit(
                Stage::ConceptExtraction.as_str(),
                TelemetryKind::StageProgress {
                    completed: i + 1,
                    total: sources.len(),
                },
            );
        }
        timings.push(self.finish(Stage::ConceptExtraction, started));

        // Contradictions.
        let contradictions = if concepts.len() < 2 {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(Stage::ContradictionDetection));
            }
            timings.push(self.skip(Stage::ContradictionDetection, "fewer than two concepts"));
            Vec::new()
        } else {
            let started = self.begin(Stage::ContradictionDetection)?;
            let found = detect_contradictions(&self.oracle, &concepts)
                .await
                .map_err(|_| self.cancelled(Stage::ContradictionDetection))?;
            timings.push(self.finish(Stage::ContradictionDetection, started));
            found
        };

        // Exploration.
        let started = self.begin(Stage::Exploration)?;
        let (candidates, escalations) = self.explore(&concepts).await?;
        let embeddings = self.register_candidates(&candidates).await?;
        timings.push(self.finish(Stage::Exploration, started));

        // Gating.
        let started = self.begin(Stage::Gating)?;
        let mut admitted = Vec::with_capacity(candidates.len());
        let mut forbidden = Vec::new();
        for candidate in candidates {
            let embedding = embeddings.get(&candidate.id).map(Vec::as_slice).unwrap_or(&[]);
            match self.gate.check(embedding) {
                Ok(Some(matched)) => {
                    let reason = format!(
                        "matches rejected class {} ({} members): {}",
                        matched.class_id, matched.member_count, matched.reason
                    );
                    debug!(hypothesis_id = %candidate.id, "{}", reason);
                    if let Some(store) = &self.store {
                        if self.cancel.is_cancelled() {
                            return Err(self.cancelled(Stage::Gating));
                        }
                        persist_hypothesis(store.as_ref(), &candidate).await;
                    }
                    self.telemetry.emit(
                        Stage::Gating.as_str(),
                        TelemetryKind::HypothesisRefuted {
                            hypothesis_id: candidate.id.to_string(),
                            reason,
                        },
                    );
                    forbidden.push(ForbiddenCandidate {
                        hypothesis_id: candidate.id,
                        thesis: candidate.thesis,
                        matched,
                    });
                }
                Ok(None) => admitted.push(candidate),
                Err(e) => {
                    warn!(error = %e, hypothesis_id = %candidate.id, "novelty check failed, admitting candidate");
                    admitted.push(candidate);
                }
            }
        }
        timings.push(self.finish(Stage::Gating, started));

        // Audit.
        let started = self.begin(Stage::Audit)?;
        let context = AuditContext::new(sources.len(), concepts.clone(), contradictions.clone());
        let outcomes = self
            .audit
            .refine_batch(admitted, &context)
            .await
            .map_err(|e| match e {
                AuditError::Cancelled { .. } => self.cancelled(Stage::Audit),
                other => PipelineError::Audit(other),
            })?;
        for outcome in outcomes.iter().filter(|o| !o.is_approved()) {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(Stage::Audit));
            }
            let Some(root) = outcome.lineage.first() else {
                continue;
            };
            let Some(embedding) = embeddings.get(root) else {
                continue;
            };
            if let Err(e) = self
                .gate
                .record_rejection(*root, embedding.clone(), outcome.rejection_reason())
                .await
            {
                warn!(error = %e, hypothesis_id = %root, "failed to record rejection");
            }
        }
        timings.push(self.finish(Stage::Audit, started));

        // Ranking.
        let started = self.begin(Stage::Ranking)?;
        let hypotheses = rank_outcomes(outcomes);
        timings.push(self.finish(Stage::Ranking, started));

        let approved = hypotheses.iter().filter(|h| h.approved).count();
        info!(
            run_id = %run_id,
            hypotheses = hypotheses.len(),
            approved = approved,
            forbidden = forbidden.len(),
            escalations = escalations,
            "synthesis run completed"
        );

        Ok(SynthesisResult {
            run_id,
            concepts,
            contradictions,
            hypotheses,
            forbidden,
            escalations,
            stage_timings: timings,
        })
    }

    /// Seed, run the chain at the controller's temperature, and add one hot
    /// burst when the controller moves into `Expanding`.
    ///
    /// Returns the candidates and the number of escalations in this run.
    async fn explore(&self, concepts: &[Concept]) -> Result<(Vec<Hypothesis>, u32)> {
        let baseline = self.config.mcmc.temperature;
        let temperature = self.trap().current_temperature(baseline);
        let window = self.config.basis_trap.window_size;

        let seed = self
            .explorer
            .seed_hypothesis(concepts)
            .await
            .map_err(|_| self.cancelled(Stage::Exploration))?;
        let chain = self
            .explorer
            .explore_at(&seed, concepts, temperature)
            .await
            .map_err(|_| self.cancelled(Stage::Exploration))?;
        debug!(
            temperature = temperature,
            steps = chain.stats.steps,
            accepted = chain.stats.accepted,
            self_loops = chain.stats.self_loops,
            "chain finished"
        );

        let samples = embed_window(self.embedder.as_ref(), &chain.trace, window, &self.cancel).await;
        if self.cancel.is_cancelled() {
            return Err(self.cancelled(Stage::Exploration));
        }
        let evaluation = self.trap().evaluate_samples(&samples, None);
        let mut candidates = chain.hypotheses;

        let Some(directive) = evaluation.directive else {
            return Ok((candidates, 0));
        };
        self.telemetry.emit(
            Stage::Exploration.as_str(),
            TelemetryKind::TemperatureEscalated {
                from: temperature,
                to: directive.temperature,
                spectral_gap: directive.spectral_gap,
            },
        );
        let start = candidates.first().cloned().unwrap_or(seed);
        let burst = self
            .explorer
            .burst(&start, concepts, directive.temperature, directive.burst_samples)
            .await
            .map_err(|_| self.cancelled(Stage::Exploration))?;

        let samples = embed_window(self.embedder.as_ref(), &burst.trace, window, &self.cancel).await;
        if self.cancel.is_cancelled() {
            return Err(self.cancelled(Stage::Exploration));
        }
        let after_burst = self.trap().evaluate_samples(&samples, None);
        debug!(mode = ?after_burst.mode, "burst evaluated");

        let mut seen: HashSet<String> = candidates.iter().map(|h| h.normalized_thesis_key()).collect();
        let before = candidates.len();
        candidates.extend(
            burst
                .hypotheses
                .into_iter()
                .filter(|h| seen.insert(h.normalized_thesis_key())),
        );
        info!(added = candidates.len() - before, "expansion burst appended candidates");

        Ok((candidates, 1))
    }

    /// Embed, announce and persist the embeddings of explored candidates.
    ///
    /// Hypothesis records are written later, once calibrated by the audit
    /// or when the novelty gate drops them.
    async fn register_candidates(
        &self,
        candidates: &[Hypothesis],
    ) -> Result<HashMap<HypothesisId, Vec<f64>>> {
        let mut embeddings = HashMap::with_capacity(candidates.len());
        for candidate in candidates {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(Stage::Exploration));
            }
            let text = format!("{} {}", candidate.thesis, candidate.mechanism);
            let vector = embed_or_neutral(self.embedder.as_ref(), &text).await;
            self.telemetry.emit(
                Stage::Exploration.as_str(),
                TelemetryKind::HypothesisGenerated {
                    hypothesis_id: candidate.id.to_string(),
                },
            );
            if let Some(store) = &self.store {
                if self.cancel.is_cancelled() {
                    return Err(self.cancelled(Stage::Exploration));
                }
                persist_candidate_embedding(store.as_ref(), candidate, &vector).await;
            }
            embeddings.insert(candidate.id, vector);
        }
        Ok(embeddings)
    }
}

async fn persist_hypothesis(store: &dyn HypothesisStore, hypothesis: &Hypothesis) {
    match store.put_hypothesis(hypothesis).await {
        Ok(()) | Err(StoreError::Conflict(_)) => {}
        Err(e) => warn!(error = %e, hypothesis_id = %hypothesis.id, "failed to persist hypothesis"),
    }
}

async fn persist_candidate_embedding(store: &dyn HypothesisStore, candidate: &Hypothesis, vector: &[f64]) {
    if synthesis_types::is_zero_vector(vector) {
        return;
    }
    let record = EmbeddingRecord {
        hypothesis_id: candidate.id,
        kind: EmbeddingKind::Candidate,
        vector: vector.to_vec(),
        reason: candidate.thesis.clone(),
    };
    if let Err(e) = store.put_embedding(record).await {
        warn!(error = %e, hypothesis_id = %candidate.id, "failed to persist candidate embedding");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use std::time::Duration;
    use synthesis_envelope::RetryConfig;
    use synthesis_explorer::McmcConfig;
    use synthesis_oracle::{FailingEmbedder, OracleTask, SimulatedOracle};
    use synthesis_store::InMemoryHypothesisStore;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
            .with_mcmc(McmcConfig::default().with_samples(6, 1).with_seed(11))
            .with_retry(RetryConfig::default().with_delays(1, 2))
    }

    fn sources() -> Vec<SourceDocument> {
        vec![
            SourceDocument::new("s1", "Sleep spindles", "Spindles gate memory replay."),
            SourceDocument::new("s2", "Synaptic homeostasis", "Sleep downscales synapses."),
        ]
    }

    fn pipeline(oracle: SimulatedOracle) -> SynthesisPipeline {
        SynthesisPipeline::builder(config(), OracleRoute::new("primary", Arc::new(oracle)))
            .with_store(Arc::new(InMemoryHypothesisStore::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn invalid_config_fails_build() {
        let result = SynthesisPipeline::builder(
            PipelineConfig::default().with_parallel_concurrency(0),
            OracleRoute::new("primary", Arc::new(SimulatedOracle::new())),
        )
        .build();
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[tokio::test]
    async fn empty_sources_rejected() {
        let p = pipeline(SimulatedOracle::new());
        assert!(matches!(p.run(&[]).await, Err(PipelineError::NoSources)));
    }

    #[tokio::test]
    async fn run_produces_ranked_hypotheses() {
        let p = pipeline(SimulatedOracle::new());
        let result = p.run(&sources()).await.unwrap();

        assert_eq!(result.concepts.len(), 4);
        assert_eq!(result.contradictions.len(), 1);
        assert!(!result.hypotheses.is_empty());
        assert!(result.hypotheses.iter().all(|h| h.approved && h.converged_at == Some(0)));
        let ranks: Vec<usize> = result.hypotheses.iter().map(|h| h.rank).collect();
        assert_eq!(ranks, (1..=result.hypotheses.len()).collect::<Vec<_>>());

        for stage in Stage::ALL {
            assert!(result.timing(stage).is_some(), "missing timing for {}", stage);
            let completed = p.telemetry().events_for(stage.as_str()).iter().any(|e| {
                matches!(e.kind, TelemetryKind::StageCompleted { .. })
            });
            assert!(completed, "no completion event for {}", stage);
        }
    }

    #[tokio::test]
    async fn single_concept_skips_contradictions() {
        let p = pipeline(SimulatedOracle::new().with_concepts_per_source(1));
        let result = p
            .run(&[SourceDocument::new("s1", "Only source", "Content.")])
            .await
            .unwrap();
        assert!(result.contradictions.is_empty());
        assert!(result.timing(Stage::ContradictionDetection).unwrap().skipped);
        assert_eq!(
            p.telemetry()
                .count(|k| matches!(k, TelemetryKind::StageSkipped { .. })),
            1
        );
    }

    #[tokio::test]
    async fn rejected_candidates_are_forbidden_next_run() {
        let p = pipeline(SimulatedOracle::new().with_approval_at(None));
        let first = p.run(&sources()).await.unwrap();
        assert!(first.hypotheses.iter().all(|h| !h.approved));
        assert!(p.gate().class_count().unwrap() > 0);

        let second = p.run(&sources()).await.unwrap();
        assert!(!second.forbidden.is_empty());
    }

    #[tokio::test]
    async fn cancellation_returns_error_not_partial_result() {
        let oracle = SimulatedOracle::new().with_delay(Duration::from_millis(20));
        let p = pipeline(oracle);
        let cancel = p.cancellation();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        });
        let err = p.run(&sources()).await.unwrap_err();
        handle.await.unwrap();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn malformed_extraction_still_completes() {
        let p = pipeline(SimulatedOracle::new().with_malformed(OracleTask::ExtractConcepts));
        let result = p.run(&sources()).await.unwrap();
        assert_eq!(result.concepts.len(), 2);
        assert_eq!(result.concepts[0].label, "Sleep spindles");
    }

    #[tokio::test]
    async fn expansion_temperature_carries_into_next_run() {
        let oracle = Arc::new(SimulatedOracle::new());
        let p = SynthesisPipeline::builder(config(), OracleRoute::new("primary", oracle.clone()))
            .with_embedder(Arc::new(FailingEmbedder::new(8)))
            .build()
            .unwrap();

        let first = p.run(&sources()).await.unwrap();
        assert_eq!(first.escalations, 1);
        assert!(p.trap_mode().is_expanding());
        let before = oracle.temperatures(OracleTask::ProposeHypothesis).len();

        let second = p.run(&sources()).await.unwrap();
        assert_eq!(second.escalations, 0);
        assert!(p.trap_mode().is_expanding());
        let main_chain = oracle.temperatures(OracleTask::ProposeHypothesis)[before..].to_vec();
        assert_eq!(main_chain, vec![1.5; 6]);
        assert_eq!(
            p.telemetry()
                .count(|k| matches!(k, TelemetryKind::TemperatureEscalated { .. })),
            1
        );
    }
}
