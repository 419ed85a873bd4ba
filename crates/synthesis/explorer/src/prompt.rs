use serde::Deserialize;
use serde_json::{json, Value};
use synthesis_oracle::{OraclePrompt, OracleTask};
use synthesis_types::Concept;

/// Concepts shown to the oracle when asking for a seed.
const MAX_SEED_CONCEPTS: usize = 12;

/// Oracle payload for a seed or proposal.
#[derive(Debug, Clone, Deserialize)]
pub struct HypothesisPayload {
    pub thesis: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mechanism: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub concept_ids: Vec<String>,
}

impl HypothesisPayload {
    pub fn is_usable(&self) -> bool {
        !self.thesis.trim().is_empty()
    }
}

fn concept_context(concepts: &[&Concept]) -> Value {
    let items: Vec<Value> = concepts
        .iter()
        .map(|c| json!({ "id": c.id, "label": c.label, "summary": c.summary }))
        .collect();
    json!({ "concepts": items })
}

fn concept_lines(concepts: &[&Concept]) -> String {
    concepts
        .iter()
        .map(|c| format!("- [{}] {}: {}", c.id, c.label, c.summary))
        .collect::<Vec<_>>()
        .join("\n")
}

const SYSTEM: &str = "You are a research scientist proposing testable hypotheses. \
Reply with a single JSON object: {\"thesis\", \"description\", \"mechanism\", \
\"confidence\" (0-100), \"concept_ids\"}.";

pub fn seed_prompt(concepts: &[Concept]) -> OraclePrompt {
    let shown: Vec<&Concept> = concepts.iter().take(MAX_SEED_CONCEPTS).collect();
    OraclePrompt::new(
        OracleTask::SeedHypothesis,
        SYSTEM,
        format!(
            "Propose one initial hypothesis that connects these concepts:\n{}",
            concept_lines(&shown)
        ),
    )
    .with_context(concept_context(&shown))
}

pub fn proposal_prompt(concepts: &[&Concept]) -> OraclePrompt {
    OraclePrompt::new(
        OracleTask::ProposeHypothesis,
        SYSTEM,
        format!(
            "Recombine the following concepts into a novel hypothesis that bridges them:\n{}",
            concept_lines(concepts)
        ),
    )
    .with_context(concept_context(concepts))
}
