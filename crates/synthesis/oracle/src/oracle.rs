use crate::error::OracleError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which pipeline task a prompt serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleTask {
    ExtractConcepts,
    DetectContradictions,
    SeedHypothesis,
    ProposeHypothesis,
    MethodologicalCritique,
    AdversarialCritique,
    SynthesizeVerdict,
    RefineHypothesis,
}

impl OracleTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleTask::ExtractConcepts => "extract_concepts",
            OracleTask::DetectContradictions => "detect_contradictions",
            OracleTask::SeedHypothesis => "seed_hypothesis",
            OracleTask::ProposeHypothesis => "propose_hypothesis",
            OracleTask::MethodologicalCritique => "methodological_critique",
            OracleTask::AdversarialCritique => "adversarial_critique",
            OracleTask::SynthesizeVerdict => "synthesize_verdict",
            OracleTask::RefineHypothesis => "refine_hypothesis",
        }
    }
}

/// A prompt plus the structured context it was rendered from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OraclePrompt {
    pub task: OracleTask,
    pub system: String,
    pub user: String,
    /// Machine-readable inputs behind the prompt text.
    #[serde(default)]
    pub context: Value,
}

impl OraclePrompt {
    pub fn new(task: OracleTask, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            task,
            system: system.into(),
            user: user.into(),
            context: Value::Null,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Sampling options for one generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON-only response when it supports one.
    pub json_mode: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
            json_mode: true,
        }
    }
}

impl GenerateOptions {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A function-style call emitted by the oracle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredCall {
    pub name: String,
    pub arguments: Value,
}

/// Raw oracle output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleResult {
    pub text: String,
    #[serde(default)]
    pub calls: Vec<StructuredCall>,
}

impl OracleResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: Vec::new(),
        }
    }

    pub fn with_call(mut self, name: impl Into<String>, arguments: Value) -> Self {
        self.calls.push(StructuredCall {
            name: name.into(),
            arguments,
        });
        self
    }
}

/// Trait for generative text providers (hosted models or simulated).
#[async_trait]
pub trait GenerativeOracle: Send + Sync {
    async fn generate(
        &self,
        prompt: &OraclePrompt,
        options: &GenerateOptions,
    ) -> Result<OracleResult, OracleError>;
}
