//! Concept extraction and contradiction detection.
//!
//! Both stages are single oracle calls whose failures degrade to
//! deterministic defaults.

use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use synthesis_envelope::{EnvelopeError, RoutedOracle};
use synthesis_oracle::{parse_result, GenerateOptions, OraclePrompt, OracleTask};
use synthesis_types::{Concept, Contradiction, SourceDocument};
use tracing::{debug, warn};

const FALLBACK_LABEL_CHARS: usize = 60;
const FALLBACK_SUMMARY_CHARS: usize = 200;
/// Characters of source content sent for extraction.
const MAX_CONTENT_CHARS: usize = 8_000;

#[derive(Debug, Deserialize)]
struct ConceptItem {
    label: String,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct ConceptsPayload {
    concepts: Vec<ConceptItem>,
}

#[derive(Debug, Deserialize)]
struct ContradictionItem {
    concept_ids: Vec<String>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ContradictionsPayload {
    contradictions: Vec<ContradictionItem>,
}

/// Only cancellation is surfaced; everything else has a fallback.
#[derive(Debug)]
pub struct Cancelled;

fn prefix(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect::<String>().trim().to_string()
}

/// One concept from the title, or the start of the content when untitled.
pub fn fallback_concept(source: &SourceDocument) -> Concept {
    let label = if source.title.trim().is_empty() {
        prefix(&source.content, FALLBACK_LABEL_CHARS)
    } else {
        source.title.trim().to_string()
    };
    Concept {
        id: format!("{}-c1", source.id),
        source_id: source.id.clone(),
        label,
        summary: prefix(&source.content, FALLBACK_SUMMARY_CHARS),
    }
}

pub async fn extract_concepts(
    oracle: &RoutedOracle,
    source: &SourceDocument,
) -> Result<Vec<Concept>, Cancelled> {
    let content = prefix(&source.content, MAX_CONTENT_CHARS);
    let prompt = OraclePrompt::new(
        OracleTask::ExtractConcepts,
        "Extract the key scientific concepts from the document. Reply with JSON \
         {\"concepts\": [{\"label\", \"summary\"}]}.",
        format!("Title: {}\n\n{}", source.title, content),
    )
    .with_context(json!({
        "source_id": source.id,
        "title": source.title,
        "content": content,
    }));
    let options = GenerateOptions::default().with_temperature(0.2);

    let payload = match oracle.generate("extract_concepts", &prompt, &options).await {
        Ok(result) => parse_result::<ConceptsPayload>(&result),
        Err(EnvelopeError::Cancelled { .. }) => return Err(Cancelled),
        Err(e) => {
            warn!(error = %e, source_id = %source.id, "concept extraction failed, using fallback concept");
            None
        }
    };

    let concepts: Vec<Concept> = payload
        .map(|p| p.concepts)
        .unwrap_or_default()
        .into_iter()
        .filter(|c| !c.label.trim().is_empty())
        .enumerate()
        .map(|(i, c)| Concept {
            id: format!("{}-c{}", source.id, i + 1),
            source_id: source.id.clone(),
            label: c.label.trim().to_string(),
            summary: c.summary,
        })
        .collect();

    if concepts.is_empty() {
        debug!(source_id = %source.id, "no usable concepts, using fallback");
        return Ok(vec![fallback_concept(source)]);
    }
    Ok(concepts)
}

/// Contradictions between at least two known concepts.
pub async fn detect_contradictions(
    oracle: &RoutedOracle,
    concepts: &[Concept],
) -> Result<Vec<Contradiction>, Cancelled> {
    let items: Vec<_> = concepts
        .iter()
        .map(|c| json!({ "id": c.id, "label": c.label, "summary": c.summary, "source_id": c.source_id }))
        .collect();
    let listing = concepts
        .iter()
        .map(|c| format!("- [{}] {}: {}", c.id, c.label, c.summary))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = OraclePrompt::new(
        OracleTask::DetectContradictions,
        "Identify pairs of concepts that make conflicting claims. Reply with JSON \
         {\"contradictions\": [{\"concept_ids\", \"description\"}]}.",
        listing,
    )
    .with_context(json!({ "concepts": items }));
    let options = GenerateOptions::default().with_temperature(0.2);

    let payload = match oracle.generate("detect_contradictions", &prompt, &options).await {
        Ok(result) => parse_result::<ContradictionsPayload>(&result),
        Err(EnvelopeError::Cancelled { .. }) => return Err(Cancelled),
        Err(e) => {
            warn!(error = %e, "contradiction detection failed, assuming none");
            None
        }
    };

    let known: HashSet<&str> = concepts.iter().map(|c| c.id.as_str()).collect();
    let contradictions = payload
        .map(|p| p.contradictions)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| {
            let mut ids: Vec<String> = item
                .concept_ids
                .into_iter()
                .filter(|id| known.contains(id.as_str()))
                .collect();
            ids.sort();
            ids.dedup();
            (ids.len() >= 2).then_some((ids, item.description))
        })
        .enumerate()
        .map(|(i, (concept_ids, description))| Contradiction {
            id: format!("x{}", i + 1),
            concept_ids,
            description,
        })
        .collect();
    Ok(contradictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synthesis_envelope::{OracleRoute, ResilientEnvelope, RetryConfig};
    use synthesis_oracle::{GenerativeOracle, ScriptedOracle, SimulatedOracle};
    use synthesis_telemetry::TelemetryBus;
    use synthesis_types::CancellationFlag;

    fn routed(oracle: Arc<dyn GenerativeOracle>, cancel: CancellationFlag) -> RoutedOracle {
        let envelope = Arc::new(ResilientEnvelope::new(
            RetryConfig::default().with_delays(1, 2),
            Arc::new(TelemetryBus::new()),
            cancel,
        ));
        RoutedOracle::new(envelope, OracleRoute::new("primary", oracle))
    }

    fn source() -> SourceDocument {
        SourceDocument::new("s1", "Sleep and memory", "Sleep consolidates declarative memory.")
    }

    #[tokio::test]
    async fn concepts_are_numbered_per_source() {
        let oracle = routed(
            Arc::new(SimulatedOracle::new().with_concepts_per_source(3)),
            CancellationFlag::new(),
        );
        let concepts = extract_concepts(&oracle, &source()).await.unwrap();
        assert_eq!(concepts.len(), 3);
        assert_eq!(concepts[0].id, "s1-c1");
        assert_eq!(concepts[2].id, "s1-c3");
        assert!(concepts.iter().all(|c| c.source_id == "s1"));
    }

    #[tokio::test]
    async fn malformed_extraction_falls_back() {
        let oracle = routed(Arc::new(ScriptedOracle::always("nothing useful")), CancellationFlag::new());
        let concepts = extract_concepts(&oracle, &source()).await.unwrap();
        assert_eq!(concepts, vec![fallback_concept(&source())]);
        assert_eq!(concepts[0].label, "Sleep and memory");
    }

    #[test]
    fn untitled_fallback_uses_content() {
        let doc = SourceDocument::new("s2", "  ", "Enzymes accelerate reactions.");
        assert_eq!(fallback_concept(&doc).label, "Enzymes accelerate reactions.");
    }

    #[tokio::test]
    async fn unknown_concept_ids_are_dropped() {
        let oracle = routed(
            Arc::new(ScriptedOracle::always(
                r#"{"contradictions":[
                    {"concept_ids":["a","b"],"description":"clash"},
                    {"concept_ids":["a","zzz"],"description":"bogus"}
                ]}"#,
            )),
            CancellationFlag::new(),
        );
        let concepts: Vec<Concept> = ["a", "b"]
            .iter()
            .map(|id| Concept {
                id: id.to_string(),
                source_id: "s".into(),
                label: id.to_string(),
                summary: String::new(),
            })
            .collect();
        let found = detect_contradictions(&oracle, &concepts).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "x1");
        assert_eq!(found[0].concept_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn cancellation_is_reported() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let oracle = routed(Arc::new(SimulatedOracle::new()), cancel);
        assert!(extract_concepts(&oracle, &source()).await.is_err());
    }
}
