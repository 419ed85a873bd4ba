use crate::config::McmcConfig;
use crate::error::ExplorerError;
use crate::prompt::{proposal_prompt, seed_prompt, HypothesisPayload};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use synthesis_envelope::{EnvelopeError, RoutedOracle};
use synthesis_oracle::{parse_result, GenerateOptions};
use synthesis_types::{Concept, Hypothesis, Provenance};
use tracing::{debug, info};

/// Probability of accepting a move that raises energy by `delta`.
///
/// Always in [0, 1]; non-positive `delta` is always accepted.
pub fn acceptance_probability(delta: f64, temperature: f64) -> f64 {
    if delta.is_nan() {
        return 0.0;
    }
    if delta <= 0.0 {
        return 1.0;
    }
    if temperature <= 0.0 || !temperature.is_finite() {
        return 0.0;
    }
    (-delta / (temperature * 100.0)).exp().clamp(0.0, 1.0)
}

/// Counters for one chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplorationStats {
    pub steps: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Proposals that failed to materialize.
    pub self_loops: usize,
}

impl ExplorationStats {
    pub fn acceptance_rate(&self) -> f64 {
        let decided = self.accepted + self.rejected;
        if decided == 0 {
            0.0
        } else {
            self.accepted as f64 / decided as f64
        }
    }
}

/// Output of one chain.
#[derive(Debug, Clone)]
pub struct ExplorationResult {
    /// Unique post-burn-in states, lowest energy first.
    pub hypotheses: Vec<Hypothesis>,
    /// Chain state after every step, burn-in included.
    pub trace: Vec<Hypothesis>,
    pub temperature: f64,
    pub stats: ExplorationStats,
}

/// Metropolis-Hastings explorer driven by the generative oracle.
pub struct HypothesisExplorer {
    oracle: RoutedOracle,
    config: McmcConfig,
}

impl HypothesisExplorer {
    pub fn new(oracle: RoutedOracle, config: McmcConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &McmcConfig {
        &self.config
    }

    /// Ask the oracle for an initial state. Any failure other than
    /// cancellation yields a deterministic seed with zero confidence.
    pub async fn seed_hypothesis(&self, concepts: &[Concept]) -> Result<Hypothesis, ExplorerError> {
        let prompt = seed_prompt(concepts);
        let options = GenerateOptions::default().with_temperature(self.config.temperature);

        let payload = match self.oracle.generate("seed_hypothesis", &prompt, &options).await {
            Ok(result) => parse_result::<HypothesisPayload>(&result).filter(|p| p.is_usable()),
            Err(EnvelopeError::Cancelled { .. }) => {
                return Err(ExplorerError::Cancelled { completed_steps: 0 })
            }
            Err(e) => {
                debug!(error = %e, "seed call failed, using deterministic seed");
                None
            }
        };

        let all: Vec<&Concept> = concepts.iter().collect();
        Ok(match payload {
            Some(p) => build_hypothesis(p, &all),
            None => fallback_seed(concepts),
        })
    }

    /// Run the chain at the baseline temperature.
    pub async fn explore(
        &self,
        initial: &Hypothesis,
        concepts: &[Concept],
    ) -> Result<ExplorationResult, ExplorerError> {
        self.explore_at(initial, concepts, self.config.temperature).await
    }

    /// Run the configured chain at `temperature`.
    pub async fn explore_at(
        &self,
        initial: &Hypothesis,
        concepts: &[Concept],
        temperature: f64,
    ) -> Result<ExplorationResult, ExplorerError> {
        self.run_chain(
            initial,
            concepts,
            temperature,
            self.config.num_samples,
            self.config.burn_in,
            0,
        )
        .await
    }

    /// Short high-temperature chain with no burn-in.
    pub async fn burst(
        &self,
        initial: &Hypothesis,
        concepts: &[Concept],
        temperature: f64,
        samples: usize,
    ) -> Result<ExplorationResult, ExplorerError> {
        self.run_chain(initial, concepts, temperature, samples, 0, 1).await
    }

    async fn run_chain(
        &self,
        initial: &Hypothesis,
        concepts: &[Concept],
        temperature: f64,
        num_samples: usize,
        burn_in: usize,
        seed_offset: u64,
    ) -> Result<ExplorationResult, ExplorerError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(seed_offset)),
            None => StdRng::from_entropy(),
        };
        let options = GenerateOptions::default().with_temperature(temperature);
        let cancel = self.oracle.envelope().cancellation().clone();

        let mut current = initial.clone();
        let mut stats = ExplorationStats::default();
        let mut trace = Vec::with_capacity(num_samples);
        let mut collected = Vec::new();

        for step in 0..num_samples {
            if cancel.is_cancelled() {
                return Err(ExplorerError::Cancelled {
                    completed_steps: step,
                });
            }
            stats.steps += 1;

            match self.propose(&mut rng, concepts, &options).await {
                Ok(Some(proposal)) => {
                    let delta = proposal.energy - current.energy;
                    let p = acceptance_probability(delta, temperature);
                    if delta <= 0.0 || rng.gen::<f64>() < p {
                        debug!(step = step, delta = delta, "proposal accepted");
                        stats.accepted += 1;
                        current = proposal;
                    } else {
                        stats.rejected += 1;
                    }
                }
                Ok(None) => stats.self_loops += 1,
                Err(EnvelopeError::Cancelled { .. }) => {
                    return Err(ExplorerError::Cancelled {
                        completed_steps: step,
                    })
                }
                Err(e) => {
                    debug!(step = step, error = %e, "proposal call failed, chain stays put");
                    stats.self_loops += 1;
                }
            }

            trace.push(current.clone());
            if step >= burn_in {
                collected.push(current.clone());
            }
        }

        let hypotheses = dedup_by_thesis(collected);
        info!(
            temperature = temperature,
            steps = stats.steps,
            accepted = stats.accepted,
            self_loops = stats.self_loops,
            unique = hypotheses.len(),
            "exploration chain finished"
        );

        Ok(ExplorationResult {
            hypotheses,
            trace,
            temperature,
            stats,
        })
    }

    /// One proposal. `Ok(None)` means the output was unusable.
    async fn propose(
        &self,
        rng: &mut StdRng,
        concepts: &[Concept],
        options: &GenerateOptions,
    ) -> Result<Option<Hypothesis>, EnvelopeError> {
        if concepts.is_empty() {
            return Ok(None);
        }
        let upper = self.config.max_concepts_per_proposal.clamp(1, concepts.len());
        let count = rng.gen_range(1..=upper);
        let mut chosen: Vec<&Concept> = concepts.choose_multiple(rng, count).collect();
        chosen.sort_by(|a, b| a.id.cmp(&b.id));

        let prompt = proposal_prompt(&chosen);
        let result = self
            .oracle
            .generate("propose_hypothesis", &prompt, options)
            .await?;
        Ok(parse_result::<HypothesisPayload>(&result)
            .filter(|p| p.is_usable())
            .map(|p| build_hypothesis(p, &chosen)))
    }
}

fn build_hypothesis(payload: HypothesisPayload, offered: &[&Concept]) -> Hypothesis {
    let offered_ids: HashSet<&str> = offered.iter().map(|c| c.id.as_str()).collect();
    let mut concept_ids: Vec<String> = payload
        .concept_ids
        .into_iter()
        .filter(|id| offered_ids.contains(id.as_str()))
        .collect();
    if concept_ids.is_empty() {
        concept_ids = offered.iter().map(|c| c.id.clone()).collect();
    }
    let source_ids: Vec<String> = offered
        .iter()
        .filter(|c| concept_ids.contains(&c.id))
        .map(|c| c.source_id.clone())
        .collect();

    Hypothesis::new(payload.thesis, payload.description, payload.mechanism)
        .with_provenance(Provenance::new(source_ids, concept_ids))
        .with_confidence(payload.confidence)
}

fn fallback_seed(concepts: &[Concept]) -> Hypothesis {
    let labels: Vec<&str> = concepts.iter().take(2).map(|c| c.label.as_str()).collect();
    let thesis = match labels.as_slice() {
        [] => "No concepts available to connect".to_string(),
        [only] => format!("{} has an unexplained mechanism", only),
        [a, b, ..] => format!("{} and {} share a common mechanism", a, b),
    };
    let provenance = Provenance::new(
        concepts.iter().map(|c| c.source_id.clone()).collect(),
        concepts.iter().map(|c| c.id.clone()).collect(),
    );
    Hypothesis::new(
        thesis,
        "Deterministic seed built from extracted concepts",
        "",
    )
    .with_provenance(provenance)
    .with_confidence(0.0)
}

/// Keep the lowest-energy state per normalized thesis, sorted by energy.
fn dedup_by_thesis(mut states: Vec<Hypothesis>) -> Vec<Hypothesis> {
    states.sort_by(|a, b| {
        a.energy
            .partial_cmp(&b.energy)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut seen = HashSet::new();
    states.retain(|h| seen.insert(h.normalized_thesis_key()));
    states
}
