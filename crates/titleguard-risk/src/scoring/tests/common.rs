use std::path::PathBuf;
use std::sync::OnceLock;

use proptest::prelude::*;

use crate::model::{BoostingParams, ModelArtifacts, ModelRegistry, TrainingSet};
use crate::scoring::{Observation, PropertyFactorRecord};

pub(super) fn training_data_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../data/synthetic_training_data.csv")
}

/// Registry trained once on the bundled dataset and shared by every test.
pub(super) fn trained_registry() -> &'static ModelRegistry {
    static REGISTRY: OnceLock<ModelRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let set = TrainingSet::from_path(training_data_path()).expect("training data parses");
        let artifacts =
            ModelArtifacts::train(&set, BoostingParams::default(), 1.0).expect("models train");
        ModelRegistry::from_artifacts(artifacts)
    })
}

pub(super) fn disabled_registry() -> ModelRegistry {
    ModelRegistry::disabled("not trained in tests")
}

/// Inside the SFHA, encroaching, over the coverage cap, with a flipped title.
pub(super) fn high_risk_record() -> PropertyFactorRecord {
    PropertyFactorRecord {
        flood_zone_code: "AE".to_string(),
        inside_flood: true,
        flood_boundary_distance_m: 0.0,
        easement_encroachment_fraction: 0.30,
        lot_coverage_fraction: 0.75,
        zoning_max_coverage_fraction: 0.70,
        property_age_years: Observation::Value(50.0),
        num_ownership_transfers_5yr: Observation::Value(3),
        avg_holding_period_years: Observation::Value(1.5),
        ownership_anomaly_score: Observation::Value(0.6),
        cv_vs_recorded_area_delta: Observation::Value(0.20),
    }
}

/// Only the required factors; every optional provider came back empty.
pub(super) fn sparse_record() -> PropertyFactorRecord {
    PropertyFactorRecord::new("X", false, 400.0, 0.02, 0.35)
}

pub(super) fn quiet_record() -> PropertyFactorRecord {
    PropertyFactorRecord {
        flood_zone_code: "X".to_string(),
        inside_flood: false,
        flood_boundary_distance_m: 2_500.0,
        easement_encroachment_fraction: 0.0,
        lot_coverage_fraction: 0.25,
        zoning_max_coverage_fraction: 0.70,
        property_age_years: Observation::Value(8.0),
        num_ownership_transfers_5yr: Observation::Value(0),
        avg_holding_period_years: Observation::Value(14.0),
        ownership_anomaly_score: Observation::Value(0.05),
        cv_vs_recorded_area_delta: Observation::Value(0.01),
    }
}

/// Records across the plausible input domain, optional factors sometimes missing.
pub(super) fn arbitrary_record() -> impl Strategy<Value = PropertyFactorRecord> {
    (
        any::<bool>(),
        0.0f64..5_000.0,
        0.0f64..1.0,
        0.0f64..1.0,
        0.3f64..0.9,
        proptest::option::of(0.0f64..150.0),
        proptest::option::of((0u32..10, 0.0f64..30.0, 0.0f64..1.0)),
        proptest::option::of(-1.0f64..1.0),
    )
        .prop_map(
            |(inside, distance, easement, coverage, zoning, age, ownership, cv)| {
                let mut record = PropertyFactorRecord::new("AE", inside, distance, easement, coverage);
                record.zoning_max_coverage_fraction = zoning;
                record.property_age_years = age.into();
                if let Some((transfers, hold, anomaly)) = ownership {
                    record.num_ownership_transfers_5yr = Observation::Value(transfers);
                    record.avg_holding_period_years = Observation::Value(hold);
                    record.ownership_anomaly_score = Observation::Value(anomaly);
                }
                record.cv_vs_recorded_area_delta = cv.into();
                record
            },
        )
}
