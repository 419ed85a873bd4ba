#![deny(unsafe_code)]
//! # synthesis-store
//!
//! Persistence interface for hypotheses, audit verdicts and embeddings.
//!
//! The orchestrator only needs a narrow slice of a relational/vector store,
//! expressed by [`HypothesisStore`]. [`InMemoryHypothesisStore`] is the
//! reference backend. Hypotheses are immutable once persisted: writing an
//! id twice is a [`StoreError::Conflict`].

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use memory::InMemoryHypothesisStore;
pub use traits::{EmbeddingKind, EmbeddingMatch, EmbeddingRecord, HypothesisStore};
