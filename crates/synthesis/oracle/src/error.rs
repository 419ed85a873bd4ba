/// Failure reported by an external oracle or embedding call.
///
/// Carries only what the provider gave us: an optional status code and a
/// message. Classification into retryable classes happens in the envelope.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}", display_error(.status, .message))]
pub struct OracleError {
    pub status: Option<u16>,
    pub message: String,
}

fn display_error(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("oracle error {}: {}", code, message),
        None => format!("oracle error: {}", message),
    }
}

impl OracleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}
