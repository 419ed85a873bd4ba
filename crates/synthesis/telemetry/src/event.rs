use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One external-call attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub route: String,
    pub operation: String,
    /// 1-based attempt number on this route.
    pub attempt: u32,
    pub latency_ms: u64,
    /// Classified error, e.g. `rate_limit`.
    pub error_class: Option<String>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CallRecord {
    pub fn success(route: &str, operation: &str, attempt: u32, latency_ms: u64) -> Self {
        Self {
            route: route.to_string(),
            operation: operation.to_string(),
            attempt,
            latency_ms,
            error_class: None,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(
        route: &str,
        operation: &str,
        attempt: u32,
        latency_ms: u64,
        error_class: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            route: route.to_string(),
            operation: operation.to_string(),
            attempt,
            latency_ms,
            error_class: Some(error_class.into()),
            error_message: Some(error_message.into()),
            timestamp: Utc::now(),
        }
    }
}

/// What happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryKind {
    StageStarted,
    StageProgress { completed: usize, total: usize },
    StageCompleted { duration_ms: u64 },
    StageSkipped { reason: String },
    CallSucceeded(CallRecord),
    Retry(CallRecord),
    Fallback(CallRecord),
    CallFailed(CallRecord),
    HypothesisGenerated { hypothesis_id: String },
    HypothesisRefuted { hypothesis_id: String, reason: String },
    HypothesisApproved { hypothesis_id: String, iteration: u32 },
    TemperatureEscalated { from: f64, to: f64, spectral_gap: f64 },
}

impl TelemetryKind {
    /// Stable name used for per-kind counters.
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryKind::StageStarted => "stage_started",
            TelemetryKind::StageProgress { .. } => "stage_progress",
            TelemetryKind::StageCompleted { .. } => "stage_completed",
            TelemetryKind::StageSkipped { .. } => "stage_skipped",
            TelemetryKind::CallSucceeded(_) => "call_succeeded",
            TelemetryKind::Retry(_) => "retry",
            TelemetryKind::Fallback(_) => "fallback",
            TelemetryKind::CallFailed(_) => "call_failed",
            TelemetryKind::HypothesisGenerated { .. } => "hypothesis_generated",
            TelemetryKind::HypothesisRefuted { .. } => "hypothesis_refuted",
            TelemetryKind::HypothesisApproved { .. } => "hypothesis_approved",
            TelemetryKind::TemperatureEscalated { .. } => "temperature_escalated",
        }
    }

    /// The call record, for call-attempt kinds.
    pub fn call_record(&self) -> Option<&CallRecord> {
        match self {
            TelemetryKind::CallSucceeded(r)
            | TelemetryKind::Retry(r)
            | TelemetryKind::Fallback(r)
            | TelemetryKind::CallFailed(r) => Some(r),
            _ => None,
        }
    }
}

/// Envelope around a [`TelemetryKind`] with ordering metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub id: Uuid,
    /// Strictly increasing within one bus.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Stage or operation identifier.
    pub scope: String,
    pub kind: TelemetryKind,
}
