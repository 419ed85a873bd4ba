use std::sync::Arc;
use std::time::Duration;
use synthesis_oracle::{OracleTask, SimulatedOracle};
use synthesis_pipeline::Stage;
use synthesis_store::HypothesisStore;
use synthesis_telemetry::TelemetryKind;
use synthesis_tests::{fast_config, pipeline_with_store, three_sources};

#[tokio::test]
async fn three_sources_with_bounded_audit_workers() {
    let oracle = Arc::new(
        SimulatedOracle::new()
            .with_contradictions(1)
            .with_delay(Duration::from_millis(2)),
    );
    let config = fast_config().with_parallel_concurrency(2);
    let (pipeline, store) = pipeline_with_store(config, oracle.clone()).unwrap();

    let result = pipeline.run(&three_sources()).await.unwrap();

    assert_eq!(result.concepts.len(), 6);
    assert_eq!(result.contradictions.len(), 1);
    assert!(!result.hypotheses.is_empty());
    assert!(result.forbidden.is_empty());

    let gauge = pipeline.audit_gauge();
    assert!(gauge.peak() >= 1);
    assert!(gauge.peak() <= 2);
    assert_eq!(gauge.current(), 0);

    assert_eq!(oracle.call_count(OracleTask::ExtractConcepts), 3);
    assert_eq!(oracle.call_count(OracleTask::DetectContradictions), 1);
    assert_eq!(oracle.call_count(OracleTask::SeedHypothesis), 1);

    for ranked in &result.hypotheses {
        assert!(ranked.approved);
        assert_eq!(ranked.converged_at, Some(0));
        assert_eq!(ranked.verdicts.len(), 1);
        let persisted = store.verdicts_for(&ranked.hypothesis.id).await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert!(persisted[0].approved);
    }
}

#[tokio::test]
async fn ranks_are_contiguous_and_ordered() {
    let (pipeline, _store) =
        pipeline_with_store(fast_config(), Arc::new(SimulatedOracle::new())).unwrap();

    let result = pipeline.run(&three_sources()).await.unwrap();

    for (i, ranked) in result.hypotheses.iter().enumerate() {
        assert_eq!(ranked.rank, i + 1);
    }
    for pair in result.hypotheses.windows(2) {
        assert!(pair[0].approved >= pair[1].approved);
        if pair[0].approved == pair[1].approved {
            assert!(pair[0].hypothesis.confidence >= pair[1].hypothesis.confidence);
        }
    }
}

#[tokio::test]
async fn stages_report_in_order() {
    let (pipeline, _store) =
        pipeline_with_store(fast_config(), Arc::new(SimulatedOracle::new())).unwrap();

    let result = pipeline.run(&three_sources()).await.unwrap();
    let events = pipeline.telemetry().events();

    let started: Vec<String> = events
        .iter()
        .filter(|e| matches!(e.kind, TelemetryKind::StageStarted))
        .map(|e| e.scope.clone())
        .collect();
    let expected: Vec<String> = Stage::ALL.iter().map(|s| s.as_str().to_string()).collect();
    assert_eq!(started, expected);

    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert_eq!(result.stage_timings.len(), Stage::ALL.len());
    assert!(result.stage_timings.iter().all(|t| !t.skipped));

    let progress = pipeline.telemetry().events_for(Stage::ConceptExtraction.as_str());
    let last = progress
        .iter()
        .filter_map(|e| match e.kind {
            TelemetryKind::StageProgress { completed, total } => Some((completed, total)),
            _ => None,
        })
        .last();
    assert_eq!(last, Some((3, 3)));

    let generated = pipeline
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::HypothesisGenerated { .. }));
    assert!(generated >= result.hypotheses.len());

    let calls = pipeline.telemetry().call_records();
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|c| c.error_class.is_none()));
}

#[tokio::test]
async fn single_concept_skips_contradictions() {
    let oracle = Arc::new(SimulatedOracle::new().with_concepts_per_source(1));
    let (pipeline, _store) = pipeline_with_store(fast_config(), oracle.clone()).unwrap();

    let sources = three_sources();
    let result = pipeline.run(&sources[..1]).await.unwrap();

    assert_eq!(result.concepts.len(), 1);
    assert!(result.contradictions.is_empty());
    assert_eq!(oracle.call_count(OracleTask::DetectContradictions), 0);
    let timing = result.timing(Stage::ContradictionDetection).unwrap();
    assert!(timing.skipped);
}
