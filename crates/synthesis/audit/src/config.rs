use serde::{Deserialize, Serialize};

/// Research domain selecting the constraint validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDomain {
    Legal,
    Educational,
    ScalingLaws,
}

impl ResearchDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchDomain::Legal => "legal",
            ResearchDomain::Educational => "educational",
            ResearchDomain::ScalingLaws => "scaling_laws",
        }
    }
}

impl std::fmt::Display for ResearchDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Audit rounds per hypothesis.
    pub max_refinement_iterations: u32,
    /// Hypotheses audited at once.
    pub parallel_concurrency: usize,
    pub domain: Option<ResearchDomain>,
    /// Sampling temperature for critique, verdict and refinement calls.
    pub critique_temperature: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_refinement_iterations: 3,
            parallel_concurrency: 3,
            domain: None,
            critique_temperature: 0.2,
        }
    }
}

impl AuditConfig {
    pub fn with_max_iterations(mut self, iterations: u32) -> Self {
        self.max_refinement_iterations = iterations;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.parallel_concurrency = concurrency;
        self
    }

    pub fn with_domain(mut self, domain: ResearchDomain) -> Self {
        self.domain = Some(domain);
        self
    }
}
