use std::path::Path;
use std::sync::Arc;
use std::thread;

use titleguard_risk::config::ModelConfig;
use titleguard_risk::model::{ArtifactSource, BoostingParams, TrainingSet};
use titleguard_risk::scoring::ScoringMethod;
use titleguard_risk::{ModelArtifacts, ModelRegistry, Observation, PropertyFactorRecord, RiskEngine};

const TRAINING_DATA: &[u8] = include_bytes!("../../../data/synthetic_training_data.csv");

fn config_in(dir: &Path) -> ModelConfig {
    let training_data = dir.join("synthetic_training_data.csv");
    std::fs::write(&training_data, TRAINING_DATA).expect("copy training data");
    ModelConfig {
        artifact_dir: dir.join("models"),
        training_data,
        boosting: BoostingParams {
            n_estimators: 60,
            ..BoostingParams::default()
        },
        ..ModelConfig::default()
    }
}

fn probes() -> Vec<PropertyFactorRecord> {
    let mut flooded = PropertyFactorRecord::new("AE", true, 0.0, 0.30, 0.75);
    flooded.property_age_years = Observation::Value(50.0);
    flooded.num_ownership_transfers_5yr = Observation::Value(3);
    flooded.avg_holding_period_years = Observation::Value(1.5);
    flooded.ownership_anomaly_score = Observation::Value(0.6);
    flooded.cv_vs_recorded_area_delta = Observation::Value(0.20);

    let mut suburban = PropertyFactorRecord::new("X", false, 820.0, 0.01, 0.32);
    suburban.property_age_years = Observation::Value(22.0);

    vec![
        flooded,
        suburban,
        PropertyFactorRecord::new("VE", false, 40.0, 0.12, 0.66),
    ]
}

#[test]
fn bundled_training_data_is_well_formed() {
    let set = TrainingSet::from_reader(TRAINING_DATA).expect("training data parses");
    assert_eq!(set.len(), 2_000);
    assert!(set.positives() > 0 && set.positives() < set.len());
}

#[test]
fn persisted_bundle_reloads_to_identical_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path());

    let trained = ModelRegistry::initialize(&config);
    assert_eq!(trained.source(), Some(ArtifactSource::Trained));
    let reloaded = ModelRegistry::initialize(&config);
    assert_eq!(reloaded.source(), Some(ArtifactSource::Loaded));

    let engine = RiskEngine::new();
    for record in probes() {
        let before = engine.score(&record, &trained);
        let after = engine.score(&record, &reloaded);
        assert_eq!(before.scoring_method, ScoringMethod::Blended);
        assert_eq!(before, after);
    }
}

#[test]
fn retrain_overwrites_the_bundle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path());
    let first = ModelRegistry::initialize(&config);

    let retrained = ModelRegistry::retrain(&config).expect("retrains");
    let on_disk = ModelArtifacts::load(config.bundle_path())
        .expect("bundle readable")
        .expect("bundle present");

    assert_eq!(Some(&on_disk), retrained.artifacts());
    let first = first.artifacts().expect("ready");
    assert!(on_disk.trained_at() >= first.trained_at());
    // Same data and seed: the fitted models match.
    assert_eq!(on_disk.classifier(), first.classifier());
    assert_eq!(on_disk.dataset(), first.dataset());
}

#[test]
fn corrupt_bundle_without_training_data_disables_ml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path());
    std::fs::remove_file(&config.training_data).expect("drop training data");
    std::fs::create_dir_all(&config.artifact_dir).expect("mkdir");
    std::fs::write(config.bundle_path(), b"\x00not a bundle").expect("write");

    let registry = ModelRegistry::initialize(&config);
    assert!(!registry.is_ready());

    let result = RiskEngine::new().score(&probes()[0], &registry);
    assert_eq!(result.scoring_method, ScoringMethod::WeightedOnly);
    assert!(result.ml.is_none());
}

/// Rewrite the persisted bundle through `damage`.
fn damage_bundle(config: &ModelConfig, damage: impl FnOnce(&mut serde_json::Value)) {
    let raw = std::fs::read(config.bundle_path()).expect("bundle written");
    let mut bundle: serde_json::Value = serde_json::from_slice(&raw).expect("bundle json");
    damage(&mut bundle);
    std::fs::write(config.bundle_path(), bundle.to_string()).expect("rewrite bundle");
}

#[test]
fn damaged_tree_is_retrained_instead_of_scored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path());
    assert!(ModelRegistry::initialize(&config).is_ready());
    damage_bundle(&config, |bundle| {
        bundle["classifier"]["trees"][0]["nodes"] = serde_json::json!([]);
    });

    let registry = ModelRegistry::initialize(&config);
    assert_eq!(registry.source(), Some(ArtifactSource::Trained));

    let result = RiskEngine::new().score(&probes()[0], &registry);
    assert_eq!(result.scoring_method, ScoringMethod::Blended);
    assert!(ModelArtifacts::load(config.bundle_path())
        .expect("bundle repaired")
        .is_some());
}

#[test]
fn damaged_bundle_without_training_data_disables_ml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path());
    assert!(ModelRegistry::initialize(&config).is_ready());
    std::fs::remove_file(&config.training_data).expect("drop training data");

    let damages: [fn(&mut serde_json::Value); 3] = [
        |bundle| bundle["classifier"]["trees"][0]["nodes"] = serde_json::json!([]),
        |bundle| bundle["classifier"]["trees"][1]["nodes"][0]["Split"]["left"] = serde_json::json!(0),
        |bundle| bundle["classifier"]["trees"][2]["nodes"][0]["Split"]["feature"] = serde_json::json!(42),
    ];
    let pristine = std::fs::read(config.bundle_path()).expect("bundle written");
    for damage in damages {
        std::fs::write(config.bundle_path(), &pristine).expect("restore bundle");
        damage_bundle(&config, damage);

        let registry = ModelRegistry::initialize(&config);
        assert!(!registry.is_ready());
        let reason = registry.disabled_reason().expect("reason recorded");
        assert!(reason.starts_with("training failed"), "{reason}");

        let result = RiskEngine::new().score(&probes()[0], &registry);
        assert_eq!(result.scoring_method, ScoringMethod::WeightedOnly);
    }
}

#[test]
fn shared_registry_scores_concurrently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(ModelRegistry::initialize(&config_in(dir.path())));
    let engine = RiskEngine::new();
    let expected: Vec<_> = probes()
        .iter()
        .map(|record| engine.score(record, &registry))
        .collect();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let engine = engine.clone();
                scope.spawn(move || {
                    probes()
                        .iter()
                        .map(|record| engine.score(record, &registry))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().expect("scoring thread panicked"), expected);
        }
    });
}
