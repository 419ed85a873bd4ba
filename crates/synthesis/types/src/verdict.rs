use crate::ids::HypothesisId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validity score used when a verdict had to be substituted.
pub const CONSERVATIVE_VALIDITY: f64 = 0.1;

/// Perspective of a single critique.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CritiqueRole {
    /// Methodological depth reviewer.
    Methodological,
    /// Adversarial skeptic.
    Adversarial,
}

impl CritiqueRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CritiqueRole::Methodological => "methodological",
            CritiqueRole::Adversarial => "adversarial",
        }
    }
}

/// One independent critique.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CritiqueScore {
    pub role: CritiqueRole,
    /// Score in [0,1].
    pub score: f64,
    pub issues: Vec<String>,
    /// True when the critique was replaced by the conservative default.
    pub fallback: bool,
}

impl CritiqueScore {
    pub fn new(role: CritiqueRole, score: f64, issues: Vec<String>) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            role,
            score,
            issues,
            fallback: false,
        }
    }

    pub fn conservative(role: CritiqueRole) -> Self {
        Self {
            role,
            score: CONSERVATIVE_VALIDITY,
            issues: vec![format!("{} critique unavailable", role.as_str())],
            fallback: true,
        }
    }
}

/// Result of one audit pass over a hypothesis at a given iteration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditVerdict {
    pub hypothesis_id: HypothesisId,
    pub iteration: u32,
    pub methodological: CritiqueScore,
    pub adversarial: CritiqueScore,
    pub approved: bool,
    /// Validity score in [0,1].
    pub validity_score: f64,
    pub remediation: Vec<String>,
    /// Any part of the verdict was substituted by the conservative default.
    pub fallback: bool,
    pub issued_at: DateTime<Utc>,
}

impl AuditVerdict {
    /// Fully substituted verdict: not approved, low validity.
    pub fn conservative(hypothesis_id: HypothesisId, iteration: u32) -> Self {
        Self {
            hypothesis_id,
            iteration,
            methodological: CritiqueScore::conservative(CritiqueRole::Methodological),
            adversarial: CritiqueScore::conservative(CritiqueRole::Adversarial),
            approved: false,
            validity_score: CONSERVATIVE_VALIDITY,
            remediation: vec![
                "Strengthen the mechanism with explicit, testable causal steps".to_string(),
            ],
            fallback: true,
            issued_at: Utc::now(),
        }
    }

    /// Force rejection, appending the reasons to the remediation list.
    pub fn block(&mut self, reasons: impl IntoIterator<Item = String>) {
        self.approved = false;
        self.remediation.extend(reasons);
    }
}
