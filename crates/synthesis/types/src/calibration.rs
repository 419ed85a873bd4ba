use serde::{Deserialize, Serialize};

/// Identifies one of the five calibration signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    SourceAgreement,
    PriorArtDistance,
    ContradictionResolution,
    EvidenceDepth,
    ConceptBridgeStrength,
}

impl FactorKind {
    pub const ALL: [FactorKind; 5] = [
        FactorKind::SourceAgreement,
        FactorKind::PriorArtDistance,
        FactorKind::ContradictionResolution,
        FactorKind::EvidenceDepth,
        FactorKind::ConceptBridgeStrength,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FactorKind::SourceAgreement => "source agreement",
            FactorKind::PriorArtDistance => "prior-art distance",
            FactorKind::ContradictionResolution => "contradiction resolution",
            FactorKind::EvidenceDepth => "evidence depth",
            FactorKind::ConceptBridgeStrength => "concept-bridge strength",
        }
    }
}

impl std::fmt::Display for FactorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The five [0,1] confidence signals for one hypothesis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFactors {
    pub source_agreement: f64,
    pub prior_art_distance: f64,
    pub contradiction_resolution: f64,
    pub evidence_depth: f64,
    pub concept_bridge_strength: f64,
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

impl CalibrationFactors {
    /// Build a factor set. Values are clamped to [0,1]; NaN becomes 0.
    pub fn new(
        source_agreement: f64,
        prior_art_distance: f64,
        contradiction_resolution: f64,
        evidence_depth: f64,
        concept_bridge_strength: f64,
    ) -> Self {
        Self {
            source_agreement,
            prior_art_distance,
            contradiction_resolution,
            evidence_depth,
            concept_bridge_strength,
        }
        .clamped()
    }

    /// Every factor set to the same value.
    pub fn uniform(v: f64) -> Self {
        Self::new(v, v, v, v, v)
    }

    pub fn clamped(&self) -> Self {
        Self {
            source_agreement: clamp_unit(self.source_agreement),
            prior_art_distance: clamp_unit(self.prior_art_distance),
            contradiction_resolution: clamp_unit(self.contradiction_resolution),
            evidence_depth: clamp_unit(self.evidence_depth),
            concept_bridge_strength: clamp_unit(self.concept_bridge_strength),
        }
    }

    /// Values in [`FactorKind::ALL`] order.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.source_agreement,
            self.prior_art_distance,
            self.contradiction_resolution,
            self.evidence_depth,
            self.concept_bridge_strength,
        ]
    }

    pub fn get(&self, kind: FactorKind) -> f64 {
        match kind {
            FactorKind::SourceAgreement => self.source_agreement,
            FactorKind::PriorArtDistance => self.prior_art_distance,
            FactorKind::ContradictionResolution => self.contradiction_resolution,
            FactorKind::EvidenceDepth => self.evidence_depth,
            FactorKind::ConceptBridgeStrength => self.concept_bridge_strength,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FactorKind, f64)> + '_ {
        FactorKind::ALL.iter().map(move |k| (*k, self.get(*k)))
    }
}
