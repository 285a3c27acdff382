use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scoring::transforms::{
    clamp_cv_delta, clamp_distance, clamp_fraction, clamp_years,
};
use crate::scoring::PropertyFactorRecord;

pub const FEATURE_COUNT: usize = 9;

/// Column order shared by the training CSV, the scaler and both classifiers.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "flood_exposure",
    "flood_boundary_distance",
    "easement_encroachment_pct",
    "lot_coverage_ratio",
    "property_age",
    "num_transfers_5yr",
    "avg_holding_period_years",
    "ownership_anomaly_score",
    "cv_vs_recorded_area_delta",
];

/// Holding period assumed when ownership history is missing. Model input only.
pub const NEUTRAL_HOLDING_PERIOD_YEARS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Build the model input, filling unavailable optionals with neutral values.
    pub fn from_record(record: &PropertyFactorRecord) -> Self {
        Self([
            if record.inside_flood { 1.0 } else { 0.0 },
            clamp_distance(record.flood_boundary_distance_m),
            clamp_fraction(record.easement_encroachment_fraction),
            clamp_fraction(record.lot_coverage_fraction),
            clamp_years(record.property_age_years.or_neutral(0.0)),
            f64::from(record.num_ownership_transfers_5yr.or_neutral(0)),
            clamp_years(
                record
                    .avg_holding_period_years
                    .or_neutral(NEUTRAL_HOLDING_PERIOD_YEARS),
            ),
            clamp_fraction(record.ownership_anomaly_score.or_neutral(0.0)),
            clamp_cv_delta(record.cv_vs_recorded_area_delta.or_neutral(0.0)),
        ])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn first_non_finite(&self) -> Option<&'static str> {
        self.0
            .iter()
            .zip(FEATURE_NAMES)
            .find(|(value, _)| !value.is_finite())
            .map(|(_, name)| name)
    }
}

/// Pair each value with its feature name.
pub fn name_values(values: &[f64; FEATURE_COUNT]) -> BTreeMap<String, f64> {
    FEATURE_NAMES
        .iter()
        .zip(values)
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Observation;

    #[test]
    fn missing_optionals_use_neutral_model_defaults() {
        let record = PropertyFactorRecord::new("AE", true, 0.0, 0.2, 0.6);
        let features = FeatureVector::from_record(&record);

        assert_eq!(
            features.0,
            [1.0, 0.0, 0.2, 0.6, 0.0, 0.0, NEUTRAL_HOLDING_PERIOD_YEARS, 0.0, 0.0]
        );
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let mut record = PropertyFactorRecord::new("X", false, -15.0, 1.7, f64::NAN);
        record.property_age_years = Observation::Value(-4.0);
        record.ownership_anomaly_score = Observation::Value(3.0);
        record.cv_vs_recorded_area_delta = Observation::Value(f64::INFINITY);

        let features = FeatureVector::from_record(&record);

        assert_eq!(features.0[1], 0.0);
        assert_eq!(features.0[2], 1.0);
        assert_eq!(features.0[3], 0.0);
        assert_eq!(features.0[4], 0.0);
        assert_eq!(features.0[7], 1.0);
        assert!(features.first_non_finite().is_none());
    }
}
