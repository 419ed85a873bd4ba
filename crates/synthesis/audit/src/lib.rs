#![deny(unsafe_code)]
//! # synthesis-audit
//!
//! Independent audit and iterative refinement of candidate hypotheses.
//!
//! Each round recalibrates the hypothesis, asks two critics (methodological
//! and adversarial) for scores, synthesizes a verdict and runs the domain
//! constraint validators. Rejected hypotheses are refined into a child with
//! a new id and the loop continues until approval or the iteration budget
//! runs out. Batches run concurrently under a counting semaphore; the
//! rounds of a single hypothesis are strictly sequential.
//!
//! Oracle failures never fail a hypothesis outright. Malformed output and
//! exhausted calls become the conservative verdict. Only cancellation
//! propagates as an error.

pub mod config;
pub mod constraints;
pub mod critique;
pub mod error;
pub mod factors;
pub mod refinement;

pub use config::{AuditConfig, ResearchDomain};
pub use constraints::{
    ConstraintValidator, ConstraintViolation, EducationalConstraints, LegalConstraints,
    ScalingLawConstraints, ValidationPipeline,
};
pub use critique::AuditCritic;
pub use error::AuditError;
pub use factors::{AuditContext, FactorSource, SignalFactorSource};
pub use refinement::{ConcurrencyGauge, GaugeGuard, RefinementLoop, RefinementOutcome};
