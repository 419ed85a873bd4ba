use crate::classify::ErrorClass;
use synthesis_oracle::OracleError;

/// Errors surfaced by the envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("{operation} on {route} exhausted {attempts} attempts ({class}): {last}")]
    Exhausted {
        route: String,
        operation: String,
        attempts: u32,
        class: ErrorClass,
        last: OracleError,
    },
    #[error("{operation} on {route} failed ({class}): {source}")]
    Fatal {
        route: String,
        operation: String,
        class: ErrorClass,
        #[source]
        source: OracleError,
    },
    #[error("cancelled before {operation}")]
    Cancelled { operation: String },
}

impl EnvelopeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EnvelopeError::Cancelled { .. })
    }

    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            EnvelopeError::Exhausted { class, .. } | EnvelopeError::Fatal { class, .. } => {
                Some(*class)
            }
            EnvelopeError::Cancelled { .. } => None,
        }
    }
}
