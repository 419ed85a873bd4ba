use std::sync::Arc;
use synthesis_envelope::OracleRoute;
use synthesis_oracle::{FailingOracle, OracleError, OracleTask, SimulatedOracle};
use synthesis_telemetry::TelemetryKind;
use synthesis_tests::{builder, fast_config, three_sources};

#[tokio::test]
async fn quota_exhausted_primary_moves_to_secondary() {
    let primary = Arc::new(FailingOracle::new(OracleError::with_status(
        429,
        "You exceeded your current quota, please check your plan",
    )));
    let secondary = Arc::new(SimulatedOracle::new());
    let pipeline = builder(fast_config(), primary.clone())
        .with_secondary(OracleRoute::new("secondary", secondary.clone()))
        .build()
        .unwrap();

    let result = pipeline.run(&three_sources()).await.unwrap();

    assert_eq!(result.concepts.len(), 6);
    assert_eq!(result.contradictions.len(), 1);
    assert!(result.approved().count() >= 1);

    // Flagged on the first call and skipped from then on.
    assert_eq!(primary.call_count(), 1);
    assert_eq!(secondary.call_count(OracleTask::ExtractConcepts), 3);

    let health = pipeline
        .oracle()
        .envelope()
        .health()
        .get("primary")
        .unwrap();
    assert!(health.quota_exhausted);
    assert!(health.quota_clears_at.is_some());
    assert_eq!(health.last_error_code.as_deref(), Some("quota_exhausted"));

    let fallbacks = pipeline
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::Fallback(_)));
    assert!(fallbacks >= 1);
    let failed = pipeline
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::CallFailed(_)));
    assert_eq!(failed, 0);
}

#[tokio::test]
async fn total_outage_degrades_without_failing_the_run() {
    let failing = Arc::new(FailingOracle::new(OracleError::new("invalid api key")));
    let pipeline = builder(fast_config(), failing.clone()).build().unwrap();

    let result = pipeline.run(&three_sources()).await.unwrap();

    // One fallback concept per source, nothing parsed from the oracle.
    assert_eq!(result.concepts.len(), 3);
    assert!(result.contradictions.is_empty());
    assert!(!result.hypotheses.is_empty());
    assert_eq!(result.approved().count(), 0);
    for ranked in &result.hypotheses {
        assert!(ranked.verdicts.iter().all(|v| !v.approved));
    }

    // Non-retryable: one attempt per call, each reported once.
    let failed = pipeline
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::CallFailed(_)));
    assert_eq!(failed, failing.call_count());
    let retries = pipeline
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::Retry(_)));
    assert_eq!(retries, 0);
}
