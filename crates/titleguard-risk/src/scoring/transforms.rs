//! Nonlinear curves mapping raw factor values onto 0-1 risk subscores.
//!
//! Every function clamps its inputs to the valid domain first, so callers can
//! pass provider values through unchecked. NaN maps to the lower bound;
//! infinities saturate at the nearest bound.

use std::collections::BTreeMap;

use super::factor::FactorKind;
use super::record::PropertyFactorRecord;

/// Flood proximity decay constant in meters.
pub const FLOOD_DECAY_METERS: f64 = 50.0;
pub const COVERAGE_STEEPNESS: f64 = 15.0;
pub const EASEMENT_MIDPOINT: f64 = 0.15;
pub const EASEMENT_STEEPNESS: f64 = 10.0;
pub const AGE_SCALE_YEARS: f64 = 40.0;
pub const CV_DELTA_MIDPOINT: f64 = 0.10;
pub const CV_DELTA_STEEPNESS: f64 = 20.0;

/// Cap on boundary distances; beyond 100 km the flood curve is flat anyway.
pub const MAX_BOUNDARY_DISTANCE_M: f64 = 100_000.0;
pub const MAX_YEARS: f64 = 1_000.0;
pub const MAX_CV_DELTA: f64 = 10.0;

/// Per-factor subscores; `None` marks a factor whose inputs are unavailable.
pub type Subscores = BTreeMap<FactorKind, Option<f64>>;

pub fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub fn clamp_non_negative(value: f64, ceiling: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, ceiling)
    }
}

pub fn clamp_distance(meters: f64) -> f64 {
    clamp_non_negative(meters, MAX_BOUNDARY_DISTANCE_M)
}

pub fn clamp_years(years: f64) -> f64 {
    clamp_non_negative(years, MAX_YEARS)
}

pub fn clamp_cv_delta(delta: f64) -> f64 {
    if delta.is_nan() {
        0.0
    } else {
        delta.clamp(-MAX_CV_DELTA, MAX_CV_DELTA)
    }
}

pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn sigmoid_around(value: f64, center: f64, steepness: f64) -> f64 {
    logistic(steepness * (value - center))
}

/// 1.0 inside the SFHA or on its boundary, otherwise `1 - e^(-50/d)`.
pub fn flood_risk(inside_flood: bool, distance_m: f64) -> f64 {
    let distance = clamp_distance(distance_m);
    if inside_flood || distance <= 0.0 {
        return 1.0;
    }
    1.0 - (-FLOOD_DECAY_METERS / distance).exp()
}

/// Logistic cliff centered on the zoning maximum.
pub fn lot_coverage_risk(coverage: f64, zoning_max: f64) -> f64 {
    sigmoid_around(
        clamp_fraction(coverage),
        clamp_fraction(zoning_max),
        COVERAGE_STEEPNESS,
    )
}

pub fn easement_risk(encroachment: f64) -> f64 {
    sigmoid_around(
        clamp_fraction(encroachment),
        EASEMENT_MIDPOINT,
        EASEMENT_STEEPNESS,
    )
}

/// Transfer count saturates through `tanh`; short holding periods (flips) decay exponentially.
pub fn ownership_risk(anomaly_score: f64, transfers: u32, avg_holding_period_years: f64) -> f64 {
    let anomaly = clamp_fraction(anomaly_score);
    let churn = (f64::from(transfers) / 3.0).tanh();
    let flipping = (-clamp_years(avg_holding_period_years) / 3.0).exp();
    clamp_fraction(0.4 * anomaly + 0.35 * churn + 0.25 * flipping)
}

pub fn age_risk(age_years: f64) -> f64 {
    1.0 - (-clamp_years(age_years) / AGE_SCALE_YEARS).exp()
}

pub fn cv_discrepancy_risk(delta: f64) -> f64 {
    sigmoid_around(
        clamp_cv_delta(delta).abs(),
        CV_DELTA_MIDPOINT,
        CV_DELTA_STEEPNESS,
    )
}

/// Score every factor of the record. Optional factors map to `None` when
/// their inputs were not reported.
pub fn compute_subscores(record: &PropertyFactorRecord) -> Subscores {
    let mut subscores = Subscores::new();

    subscores.insert(
        FactorKind::Flood,
        Some(flood_risk(record.inside_flood, record.flood_boundary_distance_m)),
    );
    subscores.insert(
        FactorKind::Easement,
        Some(easement_risk(record.easement_encroachment_fraction)),
    );
    subscores.insert(
        FactorKind::LotCoverage,
        Some(lot_coverage_risk(
            record.lot_coverage_fraction,
            record.zoning_max_coverage_fraction,
        )),
    );
    subscores.insert(
        FactorKind::Ownership,
        record.ownership().map(|signals| {
            ownership_risk(
                signals.anomaly_score,
                signals.transfers,
                signals.avg_holding_period_years,
            )
        }),
    );
    subscores.insert(
        FactorKind::PropertyAge,
        record.property_age_years.value().map(age_risk),
    );
    subscores.insert(
        FactorKind::CvDiscrepancy,
        record.cv_vs_recorded_area_delta.value().map(cv_discrepancy_risk),
    );

    subscores
}
