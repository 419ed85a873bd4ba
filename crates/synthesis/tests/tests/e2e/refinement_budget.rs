use std::sync::Arc;
use synthesis_oracle::{OracleTask, SimulatedOracle};
use synthesis_store::{EmbeddingKind, HypothesisStore};
use synthesis_telemetry::TelemetryKind;
use synthesis_tests::{builder, fast_config, pipeline_with_store, three_sources};

#[tokio::test]
async fn never_approving_exhausts_budget_and_feeds_gate() {
    let oracle = Arc::new(SimulatedOracle::new().with_approval_at(None));
    let config = fast_config().with_max_refinement_iterations(2);
    let (pipeline, store) = pipeline_with_store(config, oracle.clone()).unwrap();

    let result = pipeline.run(&three_sources()).await.unwrap();

    assert!(!result.hypotheses.is_empty());
    assert_eq!(result.approved().count(), 0);
    for ranked in &result.hypotheses {
        assert!(!ranked.approved);
        assert_eq!(ranked.converged_at, None);
        assert_eq!(ranked.verdicts.len(), 2);
        assert_eq!(ranked.hypothesis.lineage_depth(), 2);
        assert_eq!(ranked.lineage.len(), 3);
        assert_eq!(ranked.hypothesis.lineage.parent_id, Some(ranked.lineage[1]));
    }

    let n = result.hypotheses.len();
    assert_eq!(oracle.call_count(OracleTask::SynthesizeVerdict), 2 * n);
    assert_eq!(oracle.call_count(OracleTask::RefineHypothesis), 2 * n);

    let refuted = pipeline
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::HypothesisRefuted { .. }));
    assert_eq!(refuted, n);

    let rejected = store.embeddings_of_kind(EmbeddingKind::Rejected).await.unwrap();
    assert_eq!(rejected.len(), n);
    assert!(pipeline.gate().class_count().unwrap() >= 1);
}

#[tokio::test]
async fn approval_on_second_iteration() {
    let oracle = Arc::new(SimulatedOracle::new().with_approval_at(Some(1)));
    let config = fast_config().with_max_refinement_iterations(3);
    let (pipeline, _store) = pipeline_with_store(config, oracle).unwrap();

    let result = pipeline.run(&three_sources()).await.unwrap();

    for ranked in &result.hypotheses {
        assert!(ranked.approved);
        assert_eq!(ranked.converged_at, Some(1));
        assert_eq!(ranked.verdicts.len(), 2);
        assert!(!ranked.verdicts[0].approved);
        assert!(ranked.verdicts[1].approved);
        assert_eq!(ranked.hypothesis.lineage_depth(), 1);
    }
    assert_eq!(pipeline.gate().class_count().unwrap(), 0);
}

#[tokio::test]
async fn rejections_persist_into_next_run() {
    let oracle = Arc::new(SimulatedOracle::new().with_approval_at(None));
    let config = fast_config().with_max_refinement_iterations(1);
    let (first, store) = pipeline_with_store(config.clone(), oracle.clone()).unwrap();
    let earlier = first.run(&three_sources()).await.unwrap();
    assert!(!earlier.hypotheses.is_empty());

    let second = builder(config, oracle).with_store(store.clone()).build().unwrap();
    let hydrated = second.hydrate_gate().await.unwrap();
    assert!(hydrated >= 1);

    let later = second.run(&three_sources()).await.unwrap();
    assert!(!later.forbidden.is_empty());
    for forbidden in &later.forbidden {
        assert!(forbidden.matched.distance >= 0.0);
        assert!(forbidden.matched.member_count >= 1);
        assert!(later
            .hypotheses
            .iter()
            .all(|h| h.hypothesis.id != forbidden.hypothesis_id));
    }
}
