use crate::config::ResearchDomain;
use serde::{Deserialize, Serialize};
use synthesis_types::Hypothesis;

/// One finding from a constraint validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub rule: String,
    pub message: String,
    /// Blocking violations force rejection.
    pub blocking: bool,
}

impl ConstraintViolation {
    pub fn blocking(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            blocking: true,
        }
    }

    pub fn advisory(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            blocking: false,
        }
    }
}

/// Domain-specific checks on a hypothesis.
pub trait ConstraintValidator: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, hypothesis: &Hypothesis) -> Vec<ConstraintViolation>;
}

fn hypothesis_text(hypothesis: &Hypothesis) -> String {
    format!(
        "{} {} {}",
        hypothesis.thesis, hypothesis.description, hypothesis.mechanism
    )
    .to_lowercase()
}

fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Legal research must cite an authority and should name a jurisdiction.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegalConstraints;

impl ConstraintValidator for LegalConstraints {
    fn name(&self) -> &'static str {
        "legal"
    }

    fn validate(&self, hypothesis: &Hypothesis) -> Vec<ConstraintViolation> {
        let text = hypothesis_text(hypothesis);
        let mut violations = Vec::new();
        if !mentions_any(&text, &["statute", "precedent", "case law", "regulation", "court", "doctrine"]) {
            violations.push(ConstraintViolation::blocking(
                "legal.authority",
                "Ground the claim in a statute, regulation or precedent",
            ));
        }
        if !mentions_any(&text, &["jurisdiction", "federal", "state law", "eu ", "national"]) {
            violations.push(ConstraintViolation::advisory(
                "legal.jurisdiction",
                "Name the jurisdiction the claim applies to",
            ));
        }
        violations
    }
}

/// Educational research must name a learner population and a measurable
/// learning outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct EducationalConstraints;

impl ConstraintValidator for EducationalConstraints {
    fn name(&self) -> &'static str {
        "educational"
    }

    fn validate(&self, hypothesis: &Hypothesis) -> Vec<ConstraintViolation> {
        let text = hypothesis_text(hypothesis);
        let mut violations = Vec::new();
        if !mentions_any(&text, &["student", "learner", "pupil", "classroom", "grade "]) {
            violations.push(ConstraintViolation::blocking(
                "educational.population",
                "Specify the learner population",
            ));
        }
        if !mentions_any(&text, &["assessment", "test score", "achievement", "retention", "learning outcome"]) {
            violations.push(ConstraintViolation::blocking(
                "educational.outcome",
                "Specify a measurable learning outcome",
            ));
        }
        violations
    }
}

/// Scaling-law claims must name the scaled quantity and should state a
/// functional form.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalingLawConstraints;

impl ConstraintValidator for ScalingLawConstraints {
    fn name(&self) -> &'static str {
        "scaling_laws"
    }

    fn validate(&self, hypothesis: &Hypothesis) -> Vec<ConstraintViolation> {
        let text = hypothesis_text(hypothesis);
        let mut violations = Vec::new();
        if !mentions_any(&text, &["parameter", "compute", "dataset size", "tokens", "model size", "flops"]) {
            violations.push(ConstraintViolation::blocking(
                "scaling_laws.variable",
                "Name the scaled quantity (parameters, compute or data)",
            ));
        }
        if !mentions_any(&text, &["power law", "exponent", "logarithm", "log-linear", "saturat"]) {
            violations.push(ConstraintViolation::advisory(
                "scaling_laws.form",
                "State the expected functional form",
            ));
        }
        violations
    }
}

/// Ordered set of validators run against every audited hypothesis.
#[derive(Default)]
pub struct ValidationPipeline {
    validators: Vec<Box<dyn ConstraintValidator>>,
}

impl ValidationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl ConstraintValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Validators for `domain`; empty when no domain is set.
    pub fn for_domain(domain: Option<ResearchDomain>) -> Self {
        match domain {
            None => Self::new(),
            Some(ResearchDomain::Legal) => Self::new().with(LegalConstraints),
            Some(ResearchDomain::Educational) => Self::new().with(EducationalConstraints),
            Some(ResearchDomain::ScalingLaws) => Self::new().with(ScalingLawConstraints),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn validate(&self, hypothesis: &Hypothesis) -> Vec<ConstraintViolation> {
        self.validators
            .iter()
            .flat_map(|v| v.validate(hypothesis))
            .collect()
    }

    /// Messages of the blocking violations only.
    pub fn blocking_reasons(&self, hypothesis: &Hypothesis) -> Vec<String> {
        self.validate(hypothesis)
            .into_iter()
            .filter(|v| v.blocking)
            .map(|v| v.message)
            .collect()
    }
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("validators", &self.names())
            .finish()
    }
}
