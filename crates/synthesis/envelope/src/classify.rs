use serde::{Deserialize, Serialize};
use synthesis_oracle::OracleError;

/// Classification of a failed external call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    RateLimit,
    QuotaExhausted,
    ServerError,
    Timeout,
    ConnectionReset,
    Fatal,
}

const QUOTA_MARKERS: &[&str] = &["quota", "insufficient_quota", "billing"];
const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate_limit", "too many requests"];
const SERVER_MARKERS: &[&str] = &[
    "internal server error",
    "bad gateway",
    "service unavailable",
    "overloaded",
];
const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out", "deadline"];
const CONNECTION_MARKERS: &[&str] = &[
    "connection reset",
    "broken pipe",
    "econnreset",
    "connection refused",
];

fn mentions(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| message.contains(m))
}

impl ErrorClass {
    /// Classify from status code and message. Quota markers win over 429.
    pub fn classify(error: &OracleError) -> Self {
        let message = error.message.to_lowercase();
        let status = error.status;

        if mentions(&message, QUOTA_MARKERS) {
            ErrorClass::QuotaExhausted
        } else if status == Some(429) || mentions(&message, RATE_LIMIT_MARKERS) {
            ErrorClass::RateLimit
        } else if matches!(status, Some(500..=599)) || mentions(&message, SERVER_MARKERS) {
            ErrorClass::ServerError
        } else if mentions(&message, TIMEOUT_MARKERS) {
            ErrorClass::Timeout
        } else if mentions(&message, CONNECTION_MARKERS) {
            ErrorClass::ConnectionReset
        } else {
            ErrorClass::Fatal
        }
    }

    /// Worth another attempt on the same route.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorClass::RateLimit
                | ErrorClass::ServerError
                | ErrorClass::Timeout
                | ErrorClass::ConnectionReset
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::RateLimit => "rate_limit",
            ErrorClass::QuotaExhausted => "quota_exhausted",
            ErrorClass::ServerError => "server_error",
            ErrorClass::Timeout => "timeout",
            ErrorClass::ConnectionReset => "connection_reset",
            ErrorClass::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(status: Option<u16>, message: &str) -> ErrorClass {
        ErrorClass::classify(&OracleError {
            status,
            message: message.to_string(),
        })
    }

    #[test]
    fn rate_limits() {
        assert_eq!(classify(Some(429), "slow down"), ErrorClass::RateLimit);
        assert_eq!(classify(None, "Rate limit reached"), ErrorClass::RateLimit);
        assert_eq!(classify(None, "Too Many Requests"), ErrorClass::RateLimit);
    }

    #[test]
    fn quota_takes_precedence_over_429() {
        assert_eq!(
            classify(Some(429), "You exceeded your current quota"),
            ErrorClass::QuotaExhausted
        );
        assert_eq!(classify(None, "insufficient_quota"), ErrorClass::QuotaExhausted);
        assert_eq!(classify(Some(402), "billing hard limit"), ErrorClass::QuotaExhausted);
    }

    #[test]
    fn server_errors() {
        assert_eq!(classify(Some(503), "unavailable"), ErrorClass::ServerError);
        assert_eq!(classify(None, "502 Bad Gateway"), ErrorClass::ServerError);
        assert_eq!(classify(None, "model overloaded"), ErrorClass::ServerError);
    }

    #[test]
    fn timeouts_and_resets() {
        assert_eq!(classify(None, "request timed out"), ErrorClass::Timeout);
        assert_eq!(classify(None, "deadline exceeded"), ErrorClass::Timeout);
        assert_eq!(classify(None, "read: ECONNRESET"), ErrorClass::ConnectionReset);
        assert_eq!(classify(None, "broken pipe"), ErrorClass::ConnectionReset);
    }

    #[test]
    fn everything_else_is_fatal() {
        assert_eq!(classify(Some(400), "invalid request"), ErrorClass::Fatal);
        assert_eq!(classify(Some(401), "unauthorized"), ErrorClass::Fatal);
        assert!(!ErrorClass::Fatal.is_retryable());
    }

    #[test]
    fn quota_is_not_retryable_on_same_route() {
        assert!(!ErrorClass::QuotaExhausted.is_retryable());
        assert!(ErrorClass::RateLimit.is_retryable());
        assert!(ErrorClass::ConnectionReset.is_retryable());
    }
}
