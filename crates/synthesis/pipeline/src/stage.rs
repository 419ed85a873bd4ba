use serde::{Deserialize, Serialize};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ConceptExtraction,
    ContradictionDetection,
    Exploration,
    Gating,
    Audit,
    Ranking,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::ConceptExtraction,
        Stage::ContradictionDetection,
        Stage::Exploration,
        Stage::Gating,
        Stage::Audit,
        Stage::Ranking,
    ];

    /// Telemetry scope of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ConceptExtraction => "concept_extraction",
            Stage::ContradictionDetection => "contradiction_detection",
            Stage::Exploration => "exploration",
            Stage::Gating => "gating",
            Stage::Audit => "audit",
            Stage::Ranking => "ranking",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
    pub skipped: bool,
}
