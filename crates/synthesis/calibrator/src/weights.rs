use serde::{Deserialize, Serialize};
use synthesis_types::{CalibrationFactors, FactorKind};

/// Relative importance of each calibration factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationWeights {
    pub source_agreement: f64,
    pub prior_art_distance: f64,
    pub contradiction_resolution: f64,
    pub evidence_depth: f64,
    pub concept_bridge_strength: f64,
}

impl Default for CalibrationWeights {
    fn default() -> Self {
        Self {
            source_agreement: 0.20,
            prior_art_distance: 0.30,
            contradiction_resolution: 0.15,
            evidence_depth: 0.15,
            concept_bridge_strength: 0.20,
        }
    }
}

impl CalibrationWeights {
    pub fn get(&self, kind: FactorKind) -> f64 {
        match kind {
            FactorKind::SourceAgreement => self.source_agreement,
            FactorKind::PriorArtDistance => self.prior_art_distance,
            FactorKind::ContradictionResolution => self.contradiction_resolution,
            FactorKind::EvidenceDepth => self.evidence_depth,
            FactorKind::ConceptBridgeStrength => self.concept_bridge_strength,
        }
    }

    pub fn total(&self) -> f64 {
        FactorKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    /// Every weight finite and non-negative, with a positive total.
    pub fn is_valid(&self) -> bool {
        FactorKind::ALL
            .iter()
            .map(|k| self.get(*k))
            .all(|w| w.is_finite() && w >= 0.0)
            && self.total() > 0.0
    }

    /// Pairs of (weight, factor value) in kind order.
    pub fn pair_with(&self, factors: &CalibrationFactors) -> [(f64, f64); 5] {
        FactorKind::ALL.map(|k| (self.get(k), factors.get(k)))
    }
}
