use std::collections::HashSet;
use std::sync::Arc;
use synthesis_basis_trap::TrapMode;
use synthesis_oracle::{OracleTask, SimulatedOracle};
use synthesis_pipeline::{PipelineConfig, SynthesisResult};
use synthesis_telemetry::TelemetryKind;
use synthesis_tests::{builder, fast_config, three_sources, SwitchableEmbedder};

const CHAIN: usize = 10;
const BURST: usize = 6;

fn trap_config() -> PipelineConfig {
    let mut config = fast_config();
    config.mcmc = config.mcmc.with_samples(CHAIN, 2);
    config.basis_trap = config
        .basis_trap
        .with_cooldown_period(2)
        .with_expansion(1.5, BURST);
    config
}

fn thesis_keys(result: &SynthesisResult) -> Vec<String> {
    result
        .hypotheses
        .iter()
        .map(|h| h.hypothesis.normalized_thesis_key())
        .collect()
}

#[tokio::test]
async fn expansion_holds_until_recovery() {
    let oracle = Arc::new(SimulatedOracle::new());
    let embedder = Arc::new(SwitchableEmbedder::collapsed());
    let pipeline = builder(trap_config(), oracle.clone())
        .with_embedder(embedder.clone())
        .build()
        .unwrap();
    let proposals = |from: usize| oracle.temperatures(OracleTask::ProposeHypothesis)[from..].to_vec();

    let first = pipeline.run(&three_sources()).await.unwrap();
    assert_eq!(first.escalations, 1);
    assert_eq!(pipeline.trap_mode(), TrapMode::Expanding { cooldown: 0 });
    assert_eq!(proposals(0).len(), CHAIN + BURST);

    // Spread-out samples count toward recovery, but the chain stays hot.
    embedder.disperse();
    let mut seen = CHAIN + BURST;
    let second = pipeline.run(&three_sources()).await.unwrap();
    assert_eq!(second.escalations, 0);
    assert_eq!(proposals(seen), vec![1.5; CHAIN]);
    assert_eq!(pipeline.trap_mode(), TrapMode::Expanding { cooldown: 1 });

    seen += CHAIN;
    let third = pipeline.run(&three_sources()).await.unwrap();
    assert_eq!(third.escalations, 0);
    assert_eq!(proposals(seen), vec![1.5; CHAIN]);
    assert_eq!(pipeline.trap_mode(), TrapMode::Normal);

    seen += CHAIN;
    let fourth = pipeline.run(&three_sources()).await.unwrap();
    assert_eq!(fourth.escalations, 0);
    assert_eq!(proposals(seen), vec![0.6; CHAIN]);

    let escalated = pipeline
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::TemperatureEscalated { .. }));
    assert_eq!(escalated, 1);
}

#[tokio::test]
async fn burst_appends_unique_candidates_at_expansion_temperature() {
    let calm_oracle = Arc::new(SimulatedOracle::new());
    let calm = builder(trap_config(), calm_oracle.clone())
        .with_embedder(Arc::new(SwitchableEmbedder::dispersed()))
        .build()
        .unwrap();
    let baseline = calm.run(&three_sources()).await.unwrap();
    assert_eq!(baseline.escalations, 0);
    assert_eq!(
        calm_oracle.temperatures(OracleTask::ProposeHypothesis),
        vec![0.6; CHAIN]
    );

    let hot_oracle = Arc::new(SimulatedOracle::new());
    let hot = builder(trap_config(), hot_oracle.clone())
        .with_embedder(Arc::new(SwitchableEmbedder::collapsed()))
        .build()
        .unwrap();
    let expanded = hot.run(&three_sources()).await.unwrap();
    assert_eq!(expanded.escalations, 1);
    assert_eq!(
        hot_oracle.temperatures(OracleTask::ProposeHypothesis),
        [vec![0.6; CHAIN], vec![1.5; BURST]].concat()
    );

    // Same seed, same chain: the burst only adds to it.
    let chain_keys: HashSet<String> = thesis_keys(&baseline).into_iter().collect();
    let all_keys = thesis_keys(&expanded);
    let unique: HashSet<String> = all_keys.iter().cloned().collect();
    assert_eq!(unique.len(), all_keys.len());
    assert!(chain_keys.is_subset(&unique));
    assert!(unique.len() > chain_keys.len());

    let generated = hot
        .telemetry()
        .count(|k| matches!(k, TelemetryKind::HypothesisGenerated { .. }));
    assert_eq!(generated, all_keys.len());
}
