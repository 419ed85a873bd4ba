use std::sync::Arc;
use synthesis_oracle::{FailingEmbedder, SimulatedOracle};
use synthesis_store::{EmbeddingKind, HypothesisStore, InMemoryHypothesisStore};
use synthesis_tests::{builder, fast_config, three_sources};

#[tokio::test]
async fn failing_embedder_gives_neutral_prior_art() {
    let store = Arc::new(InMemoryHypothesisStore::new());
    let pipeline = builder(fast_config(), Arc::new(SimulatedOracle::new()))
        .with_store(store.clone())
        .with_embedder(Arc::new(FailingEmbedder::new(16)))
        .build()
        .unwrap();

    let result = pipeline.run(&three_sources()).await.unwrap();

    assert!(!result.hypotheses.is_empty());
    for ranked in result.approved() {
        let factors = ranked.hypothesis.calibration.unwrap();
        assert_eq!(factors.prior_art_distance, 0.5);
    }
    // Zero vectors are never stored.
    let candidates = store.embeddings_of_kind(EmbeddingKind::Candidate).await.unwrap();
    assert!(candidates.is_empty());
    // Identical zero vectors collapse the spectrum.
    assert_eq!(result.escalations, 1);
}

#[tokio::test]
async fn failing_embedder_records_no_rejections() {
    let store = Arc::new(InMemoryHypothesisStore::new());
    let pipeline = builder(
        fast_config().with_max_refinement_iterations(1),
        Arc::new(SimulatedOracle::new().with_approval_at(None)),
    )
    .with_store(store.clone())
    .with_embedder(Arc::new(FailingEmbedder::new(16)))
    .build()
    .unwrap();

    let result = pipeline.run(&three_sources()).await.unwrap();

    assert_eq!(result.approved().count(), 0);
    assert!(result.forbidden.is_empty());
    assert_eq!(pipeline.gate().class_count().unwrap(), 0);
    let rejected = store.embeddings_of_kind(EmbeddingKind::Rejected).await.unwrap();
    assert!(rejected.is_empty());

    // A second run over the same store still admits everything.
    let again = pipeline.run(&three_sources()).await.unwrap();
    assert!(again.forbidden.is_empty());
}
