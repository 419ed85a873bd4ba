#![deny(unsafe_code)]
//! # synthesis-calibrator
//!
//! Turns five noisy [0,1] signals into one defensible confidence score.
//!
//! The factors are combined with a weighted geometric mean, so one very weak
//! signal drags the score down instead of being averaged away. A balanced
//! (log-concave) factor profile earns a small bonus, a lopsided one a
//! penalty. The result is an integer score in [0, 100] and a one-sentence
//! rationale.
//!
//! Calibration is pure and deterministic: the same factors always give the
//! same score.

pub mod calibrator;
pub mod weights;

pub use calibrator::{CalibrationConfig, CalibrationOutcome, ConfidenceCalibrator};
pub use weights::CalibrationWeights;
