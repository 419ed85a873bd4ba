use std::sync::Arc;
use std::time::Duration;
use synthesis_oracle::SimulatedOracle;
use synthesis_pipeline::{PipelineError, Stage};
use synthesis_store::{EmbeddingKind, HypothesisStore, InMemoryHypothesisStore};
use synthesis_telemetry::TelemetryKind;
use synthesis_tests::{builder, fast_config, pipeline_with_store, three_sources, SlowEmbedder};
use synthesis_types::CancellationFlag;

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let oracle = Arc::new(SimulatedOracle::new());
    let (pipeline, store) = pipeline_with_store(fast_config(), oracle.clone()).unwrap();

    pipeline.cancel();
    let err = pipeline.run(&three_sources()).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Cancelled {
            stage: Stage::ConceptExtraction
        }
    ));
    assert_eq!(oracle.total_calls(), 0);
    assert_eq!(store.hypothesis_count().unwrap(), 0);
    let completed = pipeline
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::StageCompleted { .. }));
    assert_eq!(completed, 0);
}

#[tokio::test]
async fn cancellation_during_audit_stops_the_batch() {
    let oracle = Arc::new(
        SimulatedOracle::new()
            .with_approval_at(None)
            .with_delay(Duration::from_millis(10)),
    );
    let flag = CancellationFlag::new();
    let pipeline = builder(fast_config(), oracle)
        .with_cancellation(flag.clone())
        .build()
        .unwrap();

    let mut rx = pipeline.telemetry().subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event)
                    if event.scope == Stage::Audit.as_str()
                        && matches!(event.kind, TelemetryKind::StageStarted) =>
                {
                    flag.cancel();
                    break;
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let err = pipeline.run(&three_sources()).await.unwrap_err();
    watcher.await.unwrap();

    assert!(matches!(err, PipelineError::Cancelled { stage: Stage::Audit }));
    assert!(pipeline.cancellation().is_cancelled());
    assert!(pipeline
        .telemetry()
        .events_for(Stage::Ranking.as_str())
        .is_empty());
    assert_eq!(pipeline.audit_gauge().current(), 0);
}

#[tokio::test]
async fn cancellation_while_embedding_candidates_stops_the_stage() {
    let embedder = Arc::new(SlowEmbedder::new(16, Duration::from_millis(5)));
    let store = Arc::new(InMemoryHypothesisStore::new());
    let flag = CancellationFlag::new();
    let pipeline = builder(fast_config(), Arc::new(SimulatedOracle::new()))
        .with_store(store.clone())
        .with_embedder(embedder.clone())
        .with_cancellation(flag.clone())
        .build()
        .unwrap();

    let mut rx = pipeline.telemetry().subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) if matches!(event.kind, TelemetryKind::HypothesisGenerated { .. }) => {
                    flag.cancel();
                    break;
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let err = pipeline.run(&three_sources()).await.unwrap_err();
    watcher.await.unwrap();

    assert!(matches!(
        err,
        PipelineError::Cancelled {
            stage: Stage::Exploration
        }
    ));
    let generated = pipeline
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::HypothesisGenerated { .. }));
    assert!(generated <= 2, "kept embedding after cancel: {generated}");
    let stored = store.embeddings_of_kind(EmbeddingKind::Candidate).await.unwrap();
    assert!(stored.len() <= generated);
    assert_eq!(store.hypothesis_count().unwrap(), 0);
    assert!(pipeline
        .telemetry()
        .events_for(Stage::Gating.as_str())
        .is_empty());
}
