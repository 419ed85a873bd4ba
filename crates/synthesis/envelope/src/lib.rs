#![deny(unsafe_code)]
//! # synthesis-envelope
//!
//! Every external call in a synthesis run goes through a
//! [`ResilientEnvelope`]:
//!
//! - errors are classified ([`ErrorClass`]) from status code and message
//! - retryable classes are retried with capped exponential backoff and jitter
//! - each attempt runs under a timeout and emits exactly one [`CallRecord`]
//! - quota exhaustion flips a route to unhealthy and, when a secondary route
//!   exists, the operation moves there
//!
//! Route health lives in a [`ProviderHealthRegistry`] owned by the envelope
//! instance. Nothing is global.
//!
//! [`CallRecord`]: synthesis_telemetry::CallRecord

pub mod classify;
pub mod config;
pub mod envelope;
pub mod error;
pub mod health;
pub mod routed;

pub use classify::ErrorClass;
pub use config::RetryConfig;
pub use envelope::ResilientEnvelope;
pub use error::EnvelopeError;
pub use health::ProviderHealthRegistry;
pub use routed::{OracleRoute, RoutedOracle};
