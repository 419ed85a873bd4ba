use serde::{Deserialize, Serialize};

/// An input document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A concept extracted from one source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    pub source_id: String,
    pub label: String,
    pub summary: String,
}

/// A tension between two or more concepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    pub id: String,
    pub concept_ids: Vec<String>,
    pub description: String,
}

impl Contradiction {
    pub fn involves(&self, concept_id: &str) -> bool {
        self.concept_ids.iter().any(|c| c == concept_id)
    }
}
