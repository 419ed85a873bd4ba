#![deny(unsafe_code)]
//! # synthesis-basis-trap
//!
//! Detects when exploration has collapsed onto a narrow region of the
//! hypothesis space and asks for a hotter burst to escape it.
//!
//! Recent hypotheses are embedded and folded into a small fixed dimension.
//! The minimum eigenvalue of their covariance (the spectral gap) measures
//! how many directions the window still spans. When it drops below
//! `threshold_multiplier / sqrt(L)`, with `L` a Lipschitz estimate of
//! confidence over embedding distance, the controller switches to
//! `Expanding` and issues one [`ExpansionDirective`]. It returns to
//! `Normal` after `cooldown_period` consecutive readings above the recovery
//! threshold.

pub mod config;
pub mod controller;
pub mod spectral;

pub use config::BasisTrapConfig;
pub use controller::{embed_window, BasisTrapController, ExpansionDirective, TrapEvaluation, TrapMode};
pub use spectral::{covariance_eigen_range, estimate_lipschitz, fold_embedding, SpectralReading};
