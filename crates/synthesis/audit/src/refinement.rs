use crate::config::AuditConfig;
use crate::constraints::ValidationPipeline;
use crate::critique::AuditCritic;
use crate::error::AuditError;
use crate::factors::{AuditContext, FactorSource};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use synthesis_calibrator::ConfidenceCalibrator;
use synthesis_envelope::RoutedOracle;
use synthesis_store::{HypothesisStore, StoreError};
use synthesis_telemetry::{TelemetryBus, TelemetryKind};
use synthesis_types::{AuditVerdict, Hypothesis, HypothesisId};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

const SCOPE: &str = "audit";

/// Tracks how many refinement workers are running.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard { gauge: self }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Releases a gauge slot on drop.
#[derive(Debug)]
pub struct GaugeGuard<'a> {
    gauge: &'a ConcurrencyGauge,
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Result of auditing one hypothesis.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Approved version, or the latest refinement when the budget ran out.
    ///
    /// That last refinement is produced after the final audited iteration,
    /// so it is neither calibrated nor persisted: it has no calibration
    /// factors and carries its parent's confidence, which ranking uses.
    pub hypothesis: Hypothesis,
    /// One verdict per audited iteration.
    pub verdicts: Vec<AuditVerdict>,
    /// Iteration that was approved.
    pub converged_at: Option<u32>,
    /// Ids from the original candidate to `hypothesis`.
    pub lineage: Vec<HypothesisId>,
}

impl RefinementOutcome {
    pub fn is_approved(&self) -> bool {
        self.converged_at.is_some()
    }

    pub fn last_verdict(&self) -> Option<&AuditVerdict> {
        self.verdicts.last()
    }

    /// Remediation of the last verdict, joined.
    pub fn rejection_reason(&self) -> String {
        match self.last_verdict() {
            Some(v) if !v.remediation.is_empty() => v.remediation.join("; "),
            Some(_) => "not approved".to_string(),
            None => "not audited".to_string(),
        }
    }
}

/// Audit and refinement driver.
pub struct RefinementLoop {
    critic: AuditCritic,
    calibrator: ConfidenceCalibrator,
    factors: Arc<dyn FactorSource>,
    validation: ValidationPipeline,
    store: Option<Arc<dyn HypothesisStore>>,
    telemetry: Arc<TelemetryBus>,
    config: AuditConfig,
    gauge: Arc<ConcurrencyGauge>,
}

impl RefinementLoop {
    pub fn new(oracle: RoutedOracle, factors: Arc<dyn FactorSource>, config: AuditConfig) -> Self {
        let telemetry = oracle.envelope().telemetry().clone();
        Self {
            critic: AuditCritic::new(oracle, config.critique_temperature),
            calibrator: ConfidenceCalibrator::default(),
            factors,
            validation: ValidationPipeline::for_domain(config.domain),
            store: None,
            telemetry,
            config,
            gauge: Arc::new(ConcurrencyGauge::new()),
        }
    }

    pub fn with_calibrator(mut self, calibrator: ConfidenceCalibrator) -> Self {
        self.calibrator = calibrator;
        self
    }

    pub fn with_validation(mut self, validation: ValidationPipeline) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn HypothesisStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn gauge(&self) -> &Arc<ConcurrencyGauge> {
        &self.gauge
    }

    /// Store the calibrated hypothesis with its verdict. Candidates reach
    /// the store only through here, so every record carries its calibration.
    async fn persist(&self, hypothesis: &Hypothesis, verdict: &AuditVerdict) {
        let Some(store) = &self.store else {
            return;
        };
        if self.critic.oracle().envelope().cancellation().is_cancelled() {
            debug!(hypothesis_id = %hypothesis.id, "cancelled, skipping persistence");
            return;
        }
        match store.put_hypothesis(hypothesis).await {
            Ok(()) | Err(StoreError::Conflict(_)) => {}
            Err(e) => warn!(error = %e, hypothesis_id = %hypothesis.id, "failed to persist hypothesis"),
        }
        if let Err(e) = store.put_verdict(verdict).await {
            warn!(error = %e, hypothesis_id = %hypothesis.id, "failed to persist verdict");
        }
    }

    /// Audit one hypothesis until approval or the iteration budget runs out.
    pub async fn refine_one(
        &self,
        hypothesis: Hypothesis,
        context: &AuditContext,
    ) -> Result<RefinementOutcome, AuditError> {
        let cancel = self.critic.oracle().envelope().cancellation().clone();
        let mut current = hypothesis;
        let mut lineage = vec![current.id];
        let mut verdicts = Vec::new();

        for iteration in 0..self.config.max_refinement_iterations {
            if cancel.is_cancelled() {
                return Err(AuditError::Cancelled {
                    hypothesis_id: current.id,
                    iteration,
                });
            }

            let factors = self.factors.factors(&current, &lineage, context).await;
            let calibrated = self.calibrator.calibrate(&factors);
            debug!(hypothesis_id = %current.id, iteration = iteration, rationale = %calibrated.rationale, "calibrated");
            current = current
                .with_calibration(factors)
                .with_confidence(calibrated.confidence());

            let mut verdict = self.critic.verdict(&current, iteration).await?;
            let blocking = self.validation.blocking_reasons(&current);
            if !blocking.is_empty() {
                debug!(hypothesis_id = %current.id, violations = blocking.len(), "blocked by domain constraints");
                verdict.block(blocking);
            }
            self.persist(&current, &verdict).await;

            let approved = verdict.approved;
            let remediation = verdict.remediation.clone();
            verdicts.push(verdict);

            if approved {
                info!(hypothesis_id = %current.id, iteration = iteration, confidence = current.confidence, "hypothesis approved");
                self.telemetry.emit(
                    SCOPE,
                    TelemetryKind::HypothesisApproved {
                        hypothesis_id: current.id.to_string(),
                        iteration,
                    },
                );
                return Ok(RefinementOutcome {
                    hypothesis: current,
                    verdicts,
                    converged_at: Some(iteration),
                    lineage,
                });
            }

            current = self.critic.refine(&current, &remediation, iteration).await?;
            lineage.push(current.id);
        }

        let reason = format!(
            "not approved within {} refinement iterations",
            self.config.max_refinement_iterations
        );
        info!(hypothesis_id = %current.id, "{}", reason);
        self.telemetry.emit(
            SCOPE,
            TelemetryKind::HypothesisRefuted {
                hypothesis_id: current.id.to_string(),
                reason,
            },
        );
        Ok(RefinementOutcome {
            hypothesis: current,
            verdicts,
            converged_at: None,
            lineage,
        })
    }

    /// Audit a batch with at most `parallel_concurrency` workers.
    ///
    /// Outcomes are in input order.
    pub async fn refine_batch(
        &self,
        hypotheses: Vec<Hypothesis>,
        context: &AuditContext,
    ) -> Result<Vec<RefinementOutcome>, AuditError> {
        let total = hypotheses.len();
        let semaphore = Semaphore::new(self.config.parallel_concurrency.max(1));
        let finished = AtomicUsize::new(0);

        let workers = hypotheses.into_iter().map(|hypothesis| {
            let semaphore = &semaphore;
            let finished = &finished;
            async move {
                let _permit = semaphore.acquire().await?;
                let _slot = self.gauge.enter();
                let outcome = self.refine_one(hypothesis, context).await;
                let completed = finished.fetch_add(1, Ordering::SeqCst) + 1;
                self.telemetry
                    .emit(SCOPE, TelemetryKind::StageProgress { completed, total });
                outcome
            }
        });

        join_all(workers).await.into_iter().collect()
    }
}
