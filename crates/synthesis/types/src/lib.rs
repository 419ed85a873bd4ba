#![deny(unsafe_code)]
//! # synthesis-types
//!
//! Shared data model for the hypothesis synthesis orchestrator.
//!
//! - [`Hypothesis`]: immutable candidate explanation with lineage and energy
//! - [`CalibrationFactors`]: the five [0,1] confidence signals
//! - [`AuditVerdict`]: one critique-and-synthesis pass over a hypothesis
//! - [`EquivalenceClass`]: online cluster of previously rejected ideas
//! - [`ProviderHealth`]: per-route health of an external call route
//!
//! Hypotheses change only through [`Hypothesis::refine`], which always
//! produces a new id with a lineage pointer back to its parent.

pub mod cancel;
pub mod calibration;
pub mod equivalence;
pub mod health;
pub mod hypothesis;
pub mod ids;
pub mod source;
pub mod vector;
pub mod verdict;

pub use cancel::CancellationFlag;
pub use calibration::{CalibrationFactors, FactorKind};
pub use equivalence::EquivalenceClass;
pub use health::ProviderHealth;
pub use hypothesis::{normalize_thesis, Hypothesis, Lineage, Provenance};
pub use ids::{ClassId, HypothesisId};
pub use source::{Concept, Contradiction, SourceDocument};
pub use vector::{cosine_distance, cosine_similarity, euclidean_distance, is_zero_vector, l2_norm};
pub use verdict::{AuditVerdict, CritiqueRole, CritiqueScore, CONSERVATIVE_VALIDITY};
