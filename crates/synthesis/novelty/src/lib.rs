#![deny(unsafe_code)]
//! # synthesis-novelty
//!
//! Keeps the explorer from re-proposing what the audit loop already
//! rejected.
//!
//! Rejected hypothesis embeddings are clustered online into
//! [`EquivalenceClass`](synthesis_types::EquivalenceClass)es. New
//! candidates falling inside a class are forbidden patterns and are dropped
//! before audit. Classes are rebuilt from the store with
//! [`NoveltyGate::hydrate`], so rejections carry over between runs.

pub mod config;
pub mod error;
pub mod gate;

pub use config::NoveltyConfig;
pub use error::NoveltyError;
pub use gate::{ForbiddenMatch, NoveltyGate};
