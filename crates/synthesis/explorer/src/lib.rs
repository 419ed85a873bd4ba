#![deny(unsafe_code)]
//! # synthesis-explorer
//!
//! Single-chain Metropolis-Hastings sampler over hypothesis states.
//!
//! Each step asks the oracle to recombine a random handful of concepts into
//! a proposal. Lower-energy proposals are always accepted; higher-energy
//! ones with probability `exp(-dE / (T * 100))`. Proposal failures of any
//! kind (transport or parse) are self-loops: the chain stays where it is.
//! Only cancellation stops a run early.

pub mod config;
pub mod error;
pub mod explorer;
pub mod prompt;

pub use config::McmcConfig;
pub use error::ExplorerError;
pub use explorer::{acceptance_probability, ExplorationResult, ExplorationStats, HypothesisExplorer};
