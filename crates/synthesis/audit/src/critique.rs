use crate::error::AuditError;
use serde::Deserialize;
use serde_json::json;
use synthesis_envelope::{EnvelopeError, RoutedOracle};
use synthesis_oracle::{parse_result, GenerateOptions, OraclePrompt, OracleResult, OracleTask};
use synthesis_types::{AuditVerdict, CritiqueRole, CritiqueScore, Hypothesis};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct CritiquePayload {
    score: f64,
    #[serde(default)]
    issues: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VerdictPayload {
    approved: bool,
    validity_score: f64,
    #[serde(default)]
    remediation: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RefinementPayload {
    thesis: String,
    #[serde(default)]
    description: String,
    mechanism: String,
}

const METHODOLOGICAL_SYSTEM: &str = "You review research hypotheses for methodological depth: \
operationalized variables, a testable mechanism, controls. Reply with JSON {\"score\" (0-1), \"issues\"}.";

const ADVERSARIAL_SYSTEM: &str = "You are a skeptical reviewer looking for confounds, \
alternative explanations and unfalsifiable claims. Reply with JSON {\"score\" (0-1), \"issues\"}.";

const VERDICT_SYSTEM: &str = "Combine two reviews into a verdict. Reply with JSON \
{\"approved\", \"validity_score\" (0-1), \"remediation\"}.";

const REFINE_SYSTEM: &str = "Revise the hypothesis to address every remediation item. \
Reply with JSON {\"thesis\", \"description\", \"mechanism\"}.";

/// Oracle-backed critic producing verdicts and refinements.
#[derive(Debug, Clone)]
pub struct AuditCritic {
    oracle: RoutedOracle,
    options: GenerateOptions,
}

impl AuditCritic {
    pub fn new(oracle: RoutedOracle, temperature: f64) -> Self {
        Self {
            oracle,
            options: GenerateOptions::default().with_temperature(temperature),
        }
    }

    pub fn oracle(&self) -> &RoutedOracle {
        &self.oracle
    }

    /// `Ok(None)` when the call failed or returned nothing usable.
    async fn call(
        &self,
        operation: &str,
        prompt: &OraclePrompt,
        hypothesis: &Hypothesis,
        iteration: u32,
    ) -> Result<Option<OracleResult>, AuditError> {
        match self.oracle.generate(operation, prompt, &self.options).await {
            Ok(result) => Ok(Some(result)),
            Err(EnvelopeError::Cancelled { .. }) => Err(AuditError::Cancelled {
                hypothesis_id: hypothesis.id,
                iteration,
            }),
            Err(e) => {
                warn!(error = %e, hypothesis_id = %hypothesis.id, operation = operation, "audit call failed, using conservative default");
                Ok(None)
            }
        }
    }

    pub async fn critique(
        &self,
        role: CritiqueRole,
        hypothesis: &Hypothesis,
        iteration: u32,
    ) -> Result<CritiqueScore, AuditError> {
        let (task, system, operation) = match role {
            CritiqueRole::Methodological => (
                OracleTask::MethodologicalCritique,
                METHODOLOGICAL_SYSTEM,
                "methodological_critique",
            ),
            CritiqueRole::Adversarial => (
                OracleTask::AdversarialCritique,
                ADVERSARIAL_SYSTEM,
                "adversarial_critique",
            ),
        };
        let prompt = OraclePrompt::new(
            task,
            system,
            format!(
                "Thesis: {}\nDescription: {}\nMechanism: {}",
                hypothesis.thesis, hypothesis.description, hypothesis.mechanism
            ),
        )
        .with_context(json!({
            "hypothesis_id": hypothesis.id.to_string(),
            "iteration": iteration,
            "thesis": hypothesis.thesis,
        }));

        let parsed = self
            .call(operation, &prompt, hypothesis, iteration)
            .await?
            .and_then(|r| parse_result::<CritiquePayload>(&r))
            .filter(|p| p.score.is_finite());
        Ok(match parsed {
            Some(p) => CritiqueScore::new(role, p.score, p.issues),
            None => CritiqueScore::conservative(role),
        })
    }

    /// Both critiques, then the synthesis call.
    ///
    /// Any substituted part makes the whole verdict conservative.
    pub async fn verdict(&self, hypothesis: &Hypothesis, iteration: u32) -> Result<AuditVerdict, AuditError> {
        let (methodological, adversarial) = futures::join!(
            self.critique(CritiqueRole::Methodological, hypothesis, iteration),
            self.critique(CritiqueRole::Adversarial, hypothesis, iteration),
        );
        let methodological = methodological?;
        let adversarial = adversarial?;

        let prompt = OraclePrompt::new(
            OracleTask::SynthesizeVerdict,
            VERDICT_SYSTEM,
            format!(
                "Thesis: {}\nMethodological review ({:.2}): {}\nAdversarial review ({:.2}): {}",
                hypothesis.thesis,
                methodological.score,
                methodological.issues.join("; "),
                adversarial.score,
                adversarial.issues.join("; "),
            ),
        )
        .with_context(json!({
            "hypothesis_id": hypothesis.id.to_string(),
            "iteration": iteration,
            "methodological_score": methodological.score,
            "adversarial_score": adversarial.score,
        }));

        let synthesized = self
            .call("synthesize_verdict", &prompt, hypothesis, iteration)
            .await?
            .and_then(|r| parse_result::<VerdictPayload>(&r))
            .filter(|p| p.validity_score.is_finite());

        let mut verdict = AuditVerdict::conservative(hypothesis.id, iteration);
        let critiques_ok = !methodological.fallback && !adversarial.fallback;
        verdict.methodological = methodological;
        verdict.adversarial = adversarial;
        match synthesized {
            Some(p) if critiques_ok => {
                verdict.approved = p.approved;
                verdict.validity_score = p.validity_score.clamp(0.0, 1.0);
                verdict.remediation = p.remediation;
                verdict.fallback = false;
            }
            _ => debug!(hypothesis_id = %hypothesis.id, iteration = iteration, "conservative verdict"),
        }
        Ok(verdict)
    }

    /// Refined child addressing `remediation`.
    ///
    /// Unusable output falls back to appending the remediation to the
    /// parent's mechanism.
    pub async fn refine(
        &self,
        hypothesis: &Hypothesis,
        remediation: &[String],
        iteration: u32,
    ) -> Result<Hypothesis, AuditError> {
        let prompt = OraclePrompt::new(
            OracleTask::RefineHypothesis,
            REFINE_SYSTEM,
            format!(
                "Thesis: {}\nDescription: {}\nMechanism: {}\nRemediation:\n- {}",
                hypothesis.thesis,
                hypothesis.description,
                hypothesis.mechanism,
                remediation.join("\n- "),
            ),
        )
        .with_context(json!({
            "hypothesis_id": hypothesis.id.to_string(),
            "iteration": iteration,
            "thesis": hypothesis.thesis,
            "description": hypothesis.description,
            "mechanism": hypothesis.mechanism,
            "remediation": remediation,
        }));

        let parsed = self
            .call("refine_hypothesis", &prompt, hypothesis, iteration)
            .await?
            .and_then(|r| parse_result::<RefinementPayload>(&r))
            .filter(|p| !p.thesis.trim().is_empty() && !p.mechanism.trim().is_empty());

        Ok(match parsed {
            Some(p) => {
                let description = if p.description.trim().is_empty() {
                    hypothesis.description.clone()
                } else {
                    p.description
                };
                hypothesis.refine(p.thesis, description, p.mechanism)
            }
            None => deterministic_refinement(hypothesis, remediation),
        })
    }
}

/// Parent with the remediation appended to its mechanism.
pub fn deterministic_refinement(hypothesis: &Hypothesis, remediation: &[String]) -> Hypothesis {
    let mechanism = if remediation.is_empty() {
        hypothesis.mechanism.clone()
    } else {
        format!("{} Addressed: {}.", hypothesis.mechanism.trim_end(), remediation.join("; "))
    };
    hypothesis.refine(hypothesis.thesis.clone(), hypothesis.description.clone(), mechanism)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synthesis_envelope::{OracleRoute, ResilientEnvelope, RetryConfig};
    use synthesis_oracle::{FailingOracle, GenerativeOracle, OracleError, ScriptedOracle, SimulatedOracle};
    use synthesis_telemetry::TelemetryBus;
    use synthesis_types::{CancellationFlag, CONSERVATIVE_VALIDITY};

    fn critic_with(oracle: Arc<dyn GenerativeOracle>, cancel: CancellationFlag) -> AuditCritic {
        let envelope = Arc::new(ResilientEnvelope::new(
            RetryConfig::default().with_max_attempts(1).with_delays(1, 2),
            Arc::new(TelemetryBus::new()),
            cancel,
        ));
        AuditCritic::new(RoutedOracle::new(envelope, OracleRoute::new("primary", oracle)), 0.2)
    }

    fn hypothesis() -> Hypothesis {
        Hypothesis::new("Heat slows decay", "d", "Step 1: warm. Step 2: measure.")
    }

    #[tokio::test]
    async fn approving_verdict() {
        let critic = critic_with(Arc::new(SimulatedOracle::new()), CancellationFlag::new());
        let v = critic.verdict(&hypothesis(), 0).await.unwrap();
        assert!(v.approved);
        assert!(!v.fallback);
        assert_eq!(v.validity_score, 0.85);
        assert_eq!(v.methodological.score, 0.8);
    }

    #[tokio::test]
    async fn malformed_verdict_is_conservative() {
        let oracle = SimulatedOracle::new().with_malformed(OracleTask::SynthesizeVerdict);
        let critic = critic_with(Arc::new(oracle), CancellationFlag::new());
        let v = critic.verdict(&hypothesis(), 1).await.unwrap();
        assert!(!v.approved);
        assert!(v.fallback);
        assert_eq!(v.validity_score, CONSERVATIVE_VALIDITY);
        assert_eq!(v.iteration, 1);
    }

    #[tokio::test]
    async fn malformed_critique_is_conservative() {
        let oracle = SimulatedOracle::new().with_malformed(OracleTask::AdversarialCritique);
        let critic = critic_with(Arc::new(oracle), CancellationFlag::new());
        let v = critic.verdict(&hypothesis(), 0).await.unwrap();
        assert!(!v.approved);
        assert!(v.adversarial.fallback);
        assert!(!v.methodological.fallback);
    }

    #[tokio::test]
    async fn transport_failure_is_conservative() {
        let critic = critic_with(
            Arc::new(FailingOracle::new(OracleError::new("invalid api key"))),
            CancellationFlag::new(),
        );
        let v = critic.verdict(&hypothesis(), 0).await.unwrap();
        assert!(!v.approved);
        assert!(v.fallback);
    }

    #[tokio::test]
    async fn cancellation_propagates() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let critic = critic_with(Arc::new(SimulatedOracle::new()), cancel);
        let err = critic.verdict(&hypothesis(), 0).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn refinement_links_to_parent() {
        let critic = critic_with(Arc::new(SimulatedOracle::new()), CancellationFlag::new());
        let parent = hypothesis();
        let child = critic
            .refine(&parent, &["add a control".to_string()], 0)
            .await
            .unwrap();
        assert_ne!(child.id, parent.id);
        assert_eq!(child.lineage.parent_id, Some(parent.id));
        assert_eq!(child.lineage_depth(), 1);
        assert_eq!(child.thesis, "Heat slows decay (refined)");
    }

    #[tokio::test]
    async fn unusable_refinement_appends_remediation() {
        let critic = critic_with(Arc::new(ScriptedOracle::always("no json here")), CancellationFlag::new());
        let parent = hypothesis();
        let child = critic
            .refine(&parent, &["name the control group".to_string()], 0)
            .await
            .unwrap();
        assert_eq!(child.thesis, parent.thesis);
        assert!(child.mechanism.starts_with(&parent.mechanism));
        assert!(child.mechanism.contains("name the control group"));
        assert_eq!(child.lineage.parent_id, Some(parent.id));
    }
}
