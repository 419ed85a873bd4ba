use crate::calibration::CalibrationFactors;
use crate::ids::HypothesisId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weight of the confidence term in the energy function.
const ENERGY_CONFIDENCE_WEIGHT: f64 = 0.6;
/// Weight of the concept-bridge term in the energy function.
const ENERGY_BRIDGE_WEIGHT: f64 = 0.4;
/// Energy credit per bridged concept.
const ENERGY_PER_BRIDGE: f64 = 25.0;

/// Which sources and concepts a hypothesis bridges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_ids: Vec<String>,
    pub concept_ids: Vec<String>,
}

impl Provenance {
    pub fn new(source_ids: Vec<String>, concept_ids: Vec<String>) -> Self {
        let mut p = Self {
            source_ids,
            concept_ids,
        };
        p.source_ids.sort();
        p.source_ids.dedup();
        p.concept_ids.sort();
        p.concept_ids.dedup();
        p
    }
}

/// Refinement lineage. Iteration 0 is an explored (unrefined) hypothesis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub parent_id: Option<HypothesisId>,
    pub iteration: u32,
}

/// A candidate explanation.
///
/// Never edited in place once handed out: refinement goes through
/// [`Hypothesis::refine`], which mints a new id and points back at the parent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: HypothesisId,
    /// Short claim.
    pub thesis: String,
    pub description: String,
    pub mechanism: String,
    /// Inverse quality, lower is better.
    pub energy: f64,
    /// Confidence score in [0, 100].
    pub confidence: f64,
    pub provenance: Provenance,
    pub lineage: Lineage,
    /// Factors attached at the most recent calibration.
    pub calibration: Option<CalibrationFactors>,
    pub created_at: DateTime<Utc>,
}

impl Hypothesis {
    pub fn new(
        thesis: impl Into<String>,
        description: impl Into<String>,
        mechanism: impl Into<String>,
    ) -> Self {
        let mut h = Self {
            id: HypothesisId::new(),
            thesis: thesis.into(),
            description: description.into(),
            mechanism: mechanism.into(),
            energy: 0.0,
            confidence: 0.0,
            provenance: Provenance::default(),
            lineage: Lineage::default(),
            calibration: None,
            created_at: Utc::now(),
        };
        h.energy = h.compute_energy();
        h
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 100.0)
        };
        self.energy = self.compute_energy();
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self.energy = self.compute_energy();
        self
    }

    pub fn with_calibration(mut self, factors: CalibrationFactors) -> Self {
        self.calibration = Some(factors.clamped());
        self
    }

    /// Number of distinct concepts this hypothesis bridges.
    pub fn bridge_count(&self) -> usize {
        let mut ids: Vec<&str> = self.provenance.concept_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// `E(h) = 0.6*(100 - confidence) + 0.4*(100 - 25*bridges)`.
    pub fn energy_of(confidence: f64, bridge_count: usize) -> f64 {
        ENERGY_CONFIDENCE_WEIGHT * (100.0 - confidence)
            + ENERGY_BRIDGE_WEIGHT * (100.0 - ENERGY_PER_BRIDGE * bridge_count as f64)
    }

    pub fn compute_energy(&self) -> f64 {
        Self::energy_of(self.confidence, self.bridge_count())
    }

    /// Deduplication key: lowercase alphanumerics with single spaces.
    pub fn normalized_thesis_key(&self) -> String {
        normalize_thesis(&self.thesis)
    }

    /// Number of refinement steps separating this hypothesis from its root.
    pub fn lineage_depth(&self) -> u32 {
        self.lineage.iteration
    }

    /// Produce a refined child. The parent is left untouched.
    pub fn refine(
        &self,
        thesis: impl Into<String>,
        description: impl Into<String>,
        mechanism: impl Into<String>,
    ) -> Hypothesis {
        let mut child = Hypothesis {
            id: HypothesisId::new(),
            thesis: thesis.into(),
            description: description.into(),
            mechanism: mechanism.into(),
            energy: 0.0,
            confidence: self.confidence,
            provenance: self.provenance.clone(),
            lineage: Lineage {
                parent_id: Some(self.id),
                iteration: self.lineage.iteration + 1,
            },
            calibration: None,
            created_at: Utc::now(),
        };
        child.energy = child.compute_energy();
        child
    }
}

/// Normalize a thesis string into its deduplication key.
pub fn normalize_thesis(thesis: &str) -> String {
    thesis
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
