#![deny(unsafe_code)]
//! # synthesis-pipeline
//!
//! Turns a set of source documents into ranked, audited hypotheses.
//!
//! The [`SynthesisPipeline`] runs six stages in order: concept extraction,
//! contradiction detection, Metropolis-Hastings exploration with basis-trap
//! escalation, novelty gating, the audit/refinement batch and final ranking.
//! Every oracle call goes through one shared resilient envelope, and every
//! stage reports to the telemetry bus.
//!
//! ```no_run
//! use std::sync::Arc;
//! use synthesis_oracle::SimulatedOracle;
//! use synthesis_envelope::OracleRoute;
//! use synthesis_pipeline::{PipelineConfig, SynthesisPipeline};
//! use synthesis_types::SourceDocument;
//!
//! # async fn demo() -> Result<(), synthesis_pipeline::PipelineError> {
//! let pipeline = SynthesisPipeline::builder(
//!     PipelineConfig::default(),
//!     OracleRoute::new("simulated", Arc::new(SimulatedOracle::new())),
//! )
//! .build()?;
//! let result = pipeline
//!     .run(&[SourceDocument::new("s1", "Title", "Content")])
//!     .await?;
//! println!("{} hypotheses", result.hypotheses.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod extraction;
pub mod result;
pub mod stage;

pub use config::PipelineConfig;
pub use coordinator::{PipelineBuilder, SynthesisPipeline};
pub use error::{ConfigError, PipelineError, Result};
pub use result::{rank_outcomes, ForbiddenCandidate, RankedHypothesis, SynthesisResult};
pub use stage::{Stage, StageTiming};
pub use synthesis_telemetry::{init_tracing, TracingConfig};
