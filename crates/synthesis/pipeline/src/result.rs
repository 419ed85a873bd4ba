use crate::stage::{Stage, StageTiming};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use synthesis_audit::RefinementOutcome;
use synthesis_novelty::ForbiddenMatch;
use synthesis_types::{AuditVerdict, Concept, Contradiction, Hypothesis, HypothesisId};
use uuid::Uuid;

/// A final hypothesis with its audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedHypothesis {
    /// 1-based.
    pub rank: usize,
    pub hypothesis: Hypothesis,
    pub approved: bool,
    pub converged_at: Option<u32>,
    pub verdicts: Vec<AuditVerdict>,
    /// Original candidate first.
    pub lineage: Vec<HypothesisId>,
}

/// A candidate dropped by the novelty gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForbiddenCandidate {
    pub hypothesis_id: HypothesisId,
    pub thesis: String,
    pub matched: ForbiddenMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub run_id: Uuid,
    pub concepts: Vec<Concept>,
    pub contradictions: Vec<Contradiction>,
    pub hypotheses: Vec<RankedHypothesis>,
    pub forbidden: Vec<ForbiddenCandidate>,
    /// Basis-trap directives acted on in this run.
    pub escalations: u32,
    pub stage_timings: Vec<StageTiming>,
}

impl SynthesisResult {
    pub fn approved(&self) -> impl Iterator<Item = &RankedHypothesis> {
        self.hypotheses.iter().filter(|h| h.approved)
    }

    pub fn timing(&self, stage: Stage) -> Option<&StageTiming> {
        self.stage_timings.iter().find(|t| t.stage == stage)
    }
}

fn compare(a: &RefinementOutcome, b: &RefinementOutcome) -> Ordering {
    b.is_approved()
        .cmp(&a.is_approved())
        .then_with(|| {
            b.hypothesis
                .confidence
                .partial_cmp(&a.hypothesis.confidence)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            a.hypothesis
                .energy
                .partial_cmp(&b.hypothesis.energy)
                .unwrap_or(Ordering::Equal)
        })
}

/// Approved first, then confidence descending, then energy ascending.
pub fn rank_outcomes(mut outcomes: Vec<RefinementOutcome>) -> Vec<RankedHypothesis> {
    outcomes.sort_by(compare);
    outcomes
        .into_iter()
        .enumerate()
        .map(|(i, o)| RankedHypothesis {
            rank: i + 1,
            approved: o.is_approved(),
            converged_at: o.converged_at,
            hypothesis: o.hypothesis,
            verdicts: o.verdicts,
            lineage: o.lineage,
        })
        .collect()
}
