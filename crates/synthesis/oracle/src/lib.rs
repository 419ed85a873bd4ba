#![deny(unsafe_code)]
//! # synthesis-oracle
//!
//! Interfaces to the two external collaborators every stage talks to:
//!
//! - [`GenerativeOracle`]: prompt in, text (and optional structured calls) out
//! - [`EmbeddingService`]: text in, fixed-dimension vector out
//!
//! Oracle output is untrusted. [`parse_oracle_json`] returns `Option<T>` and
//! callers decide the fallback; malformed output is never an error.
//!
//! The crate also ships deterministic doubles ([`SimulatedOracle`],
//! [`ScriptedOracle`], [`FailingOracle`], [`HashEmbedder`],
//! [`FailingEmbedder`]) so every other crate can be tested offline.

pub mod embedding;
pub mod error;
pub mod oracle;
pub mod parse;
pub mod simulated;

pub use embedding::{embed_or_neutral, EmbeddingService, FailingEmbedder, HashEmbedder};
pub use error::OracleError;
pub use oracle::{
    GenerateOptions, GenerativeOracle, OraclePrompt, OracleResult, OracleTask, StructuredCall,
};
pub use parse::{parse_oracle_json, parse_oracle_output, parse_result, ParseStatus, Parsed};
pub use simulated::{FailingOracle, ScriptedOracle, SimulatedOracle};
