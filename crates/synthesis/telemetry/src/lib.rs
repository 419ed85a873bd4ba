#![deny(unsafe_code)]
//! # synthesis-telemetry
//!
//! Ordered telemetry stream for a synthesis run, plus `tracing` setup.
//!
//! Every stage transition, external call attempt and hypothesis lifecycle
//! change is published on a [`TelemetryBus`]. Subscribers receive events
//! live over a broadcast channel; a bounded history keeps them for later
//! inspection in sequence order.

pub mod bus;
pub mod error;
pub mod event;
pub mod init;

pub use bus::{TelemetryBus, TelemetryStats, DEFAULT_HISTORY_CAPACITY};
pub use error::TelemetryError;
pub use event::{CallRecord, TelemetryEvent, TelemetryKind};
pub use init::{init_tracing, TracingConfig};
