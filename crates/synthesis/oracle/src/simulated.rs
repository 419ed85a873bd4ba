//! Deterministic oracles for tests and offline runs.

use crate::error::OracleError;
use crate::oracle::{GenerateOptions, GenerativeOracle, OraclePrompt, OracleResult, OracleTask};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Current and peak number of concurrent calls.
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Simulated oracle that answers every task with well-formed JSON.
///
/// Output depends only on the prompt context, so runs are reproducible.
pub struct SimulatedOracle {
    concepts_per_source: usize,
    contradictions_per_call: usize,
    critique_score: f64,
    approve_at_iteration: Option<u32>,
    malformed: HashSet<OracleTask>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<OracleTask, usize>>,
    temperatures: Mutex<Vec<(OracleTask, f64)>>,
    in_flight: InFlight,
}

impl SimulatedOracle {
    pub fn new() -> Self {
        Self {
            concepts_per_source: 2,
            contradictions_per_call: 1,
            critique_score: 0.8,
            approve_at_iteration: Some(0),
            malformed: HashSet::new(),
            delay: None,
            calls: Mutex::new(HashMap::new()),
            temperatures: Mutex::new(Vec::new()),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_concepts_per_source(mut self, n: usize) -> Self {
        self.concepts_per_source = n;
        self
    }

    pub fn with_contradictions(mut self, n: usize) -> Self {
        self.contradictions_per_call = n;
        self
    }

    pub fn with_critique_score(mut self, score: f64) -> Self {
        self.critique_score = score;
        self
    }

    /// Approve verdicts from this iteration on; `None` never approves.
    pub fn with_approval_at(mut self, iteration: Option<u32>) -> Self {
        self.approve_at_iteration = iteration;
        self
    }

    /// Answer `task` with prose instead of JSON.
    pub fn with_malformed(mut self, task: OracleTask) -> Self {
        self.malformed.insert(task);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self, task: OracleTask) -> usize {
        lock(&self.calls).get(&task).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// Sampling temperatures requested for `task`, in call order.
    pub fn temperatures(&self, task: OracleTask) -> Vec<f64> {
        lock(&self.temperatures)
            .iter()
            .filter(|(t, _)| *t == task)
            .map(|(_, temp)| *temp)
            .collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }

    fn respond(&self, prompt: &OraclePrompt) -> Value {
        let ctx = &prompt.context;
        match prompt.task {
            OracleTask::ExtractConcepts => {
                let title = str_field(ctx, "title");
                let words: Vec<&str> = title.split_whitespace().collect();
                let concepts: Vec<Value> = (0..self.concepts_per_source)
                    .map(|i| {
                        let word = words.get(i % words.len().max(1)).copied().unwrap_or("topic");
                        json!({
                            "label": format!("{} {}", word.to_lowercase(), i + 1),
                            "summary": format!("Aspect {} of '{}'", i + 1, title),
                        })
                    })
                    .collect();
                json!({ "concepts": concepts })
            }
            OracleTask::DetectContradictions => {
                let ids = concept_ids(ctx);
                let contradictions: Vec<Value> = ids
                    .windows(2)
                    .take(self.contradictions_per_call)
                    .map(|pair| {
                        json!({
                            "concept_ids": [pair[0], pair[1]],
                            "description": format!("{} and {} predict opposite effects", pair[0], pair[1]),
                        })
                    })
                    .collect();
                json!({ "contradictions": contradictions })
            }
            OracleTask::SeedHypothesis | OracleTask::ProposeHypothesis => {
                let ids = concept_ids(ctx);
                let labels = concept_labels(ctx);
                let confidence = if prompt.task == OracleTask::SeedHypothesis {
                    50.0
                } else {
                    45.0 + (stable_hash(&ids.join("|")) % 45) as f64
                };
                json!({
                    "thesis": format!("Bridging {} reveals a shared mechanism", labels.join(" and ")),
                    "description": format!("Combines {} concepts into one account", ids.len()),
                    "mechanism": "Step 1: the first concept sets a precondition. Step 2: the second concept amplifies it. Step 3: the effect is measurable.",
                    "confidence": confidence,
                    "concept_ids": ids,
                })
            }
            OracleTask::MethodologicalCritique | OracleTask::AdversarialCritique => {
                json!({
                    "score": self.critique_score,
                    "issues": ["sample size unstated"],
                })
            }
            OracleTask::SynthesizeVerdict => {
                let iteration = ctx.get("iteration").and_then(Value::as_u64).unwrap_or(0) as u32;
                let approved = self.approve_at_iteration.is_some_and(|at| iteration >= at);
                if approved {
                    json!({ "approved": true, "validity_score": 0.85, "remediation": [] })
                } else {
                    json!({
                        "approved": false,
                        "validity_score": 0.35,
                        "remediation": [format!("State a falsifiable prediction (round {})", iteration)],
                    })
                }
            }
            OracleTask::RefineHypothesis => {
                let thesis = str_field(ctx, "thesis");
                let mechanism = str_field(ctx, "mechanism");
                json!({
                    "thesis": format!("{} (refined)", thesis),
                    "description": str_field(ctx, "description"),
                    "mechanism": format!("{} Step: add a control condition.", mechanism),
                })
            }
        }
    }
}

impl Default for SimulatedOracle {
    fn default() -> Self {
        Self::new()
    }
}

fn str_field(ctx: &Value, key: &str) -> String {
    ctx.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn concept_ids(ctx: &Value) -> Vec<String> {
    concept_field(ctx, "id")
}

fn concept_labels(ctx: &Value) -> Vec<String> {
    concept_field(ctx, "label")
}

fn concept_field(ctx: &Value, key: &str) -> Vec<String> {
    ctx.get("concepts")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c.get(key).and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn stable_hash(s: &str) -> u64 {
    let hash = blake3::hash(s.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

#[async_trait]
impl GenerativeOracle for SimulatedOracle {
    async fn generate(
        &self,
        prompt: &OraclePrompt,
        options: &GenerateOptions,
    ) -> Result<OracleResult, OracleError> {
        *lock(&self.calls).entry(prompt.task).or_insert(0) += 1;
        lock(&self.temperatures).push((prompt.task, options.temperature));

        self.in_flight.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.exit();

        if self.malformed.contains(&prompt.task) {
            return Ok(OracleResult::text(
                "I'm sorry, I can only describe this informally.",
            ));
        }
        Ok(OracleResult::text(self.respond(prompt).to_string()))
    }
}

/// Oracle that replays a queue of canned outcomes.
///
/// Once the queue is empty it answers with the fallback response, or an
/// error when none is set.
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<OracleResult, OracleError>>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(OracleTask, f64)>>,
    in_flight: InFlight,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Result<String, OracleError>>) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(OracleResult::text))
                    .collect(),
            ),
            fallback: None,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            in_flight: InFlight::default(),
        }
    }

    /// Always answer with `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self::new(Vec::new()).with_fallback(text)
    }

    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, response: Result<OracleResult, OracleError>) {
        lock(&self.responses).push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tasks and temperatures seen, in call order.
    pub fn prompts(&self) -> Vec<(OracleTask, f64)> {
        lock(&self.prompts).clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeOracle for ScriptedOracle {
    async fn generate(
        &self,
        prompt: &OraclePrompt,
        options: &GenerateOptions,
    ) -> Result<OracleResult, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push((prompt.task, options.temperature));

        self.in_flight.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.exit();

        let next = lock(&self.responses).pop_front();
        match next {
            Some(outcome) => outcome,
            None => match &self.fallback {
                Some(text) => Ok(OracleResult::text(text.clone())),
                None => Err(OracleError::new("scripted oracle exhausted")),
            },
        }
    }
}

/// Oracle that always fails with the same error.
pub struct FailingOracle {
    error: OracleError,
    calls: AtomicUsize,
}

impl FailingOracle {
    pub fn new(error: OracleError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FailingOracle {
    fn default() -> Self {
        Self::new(OracleError::new("simulated oracle failure"))
    }
}

#[async_trait]
impl GenerativeOracle for FailingOracle {
    async fn generate(
        &self,
        _prompt: &OraclePrompt,
        _options: &GenerateOptions,
    ) -> Result<OracleResult, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}
