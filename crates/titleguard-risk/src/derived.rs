//! Calculators that turn raw parcel, building and deed data into the
//! factor values carried by [`PropertyFactorRecord`].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::scoring::{round_to, Observation, PropertyFactorRecord};

/// Relative area growth above which a structure is flagged as an
/// unrecorded expansion.
pub const DEFAULT_EXPANSION_THRESHOLD: f64 = 0.10;

pub const DEFAULT_LOOKBACK_YEARS: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LotCoverage {
    pub ratio: f64,
    pub delta_from_limit: f64,
    pub over_limit: bool,
}

/// Building footprint over parcel area, compared against the zoning cap.
pub fn lot_coverage(building_sqft: f64, parcel_sqft: f64, zoning_max: f64) -> LotCoverage {
    let ratio = if parcel_sqft > 0.0 {
        round_to(building_sqft / parcel_sqft, 4)
    } else {
        0.0
    };
    let delta_from_limit = round_to(ratio - zoning_max, 4);
    LotCoverage {
        ratio,
        delta_from_limit,
        over_limit: delta_from_limit > 0.0,
    }
}

/// Fraction of the building footprint overlapping easements.
pub fn easement_encroachment(building_sqft: f64, overlap_sqft: f64) -> f64 {
    if building_sqft > 0.0 {
        round_to(overlap_sqft / building_sqft, 4)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CvDiscrepancy {
    /// Signed relative difference, imagery minus record.
    pub delta: f64,
    pub unrecorded_expansion: bool,
}

pub fn cv_discrepancy(cv_sqft: f64, recorded_sqft: f64, threshold: f64) -> CvDiscrepancy {
    if recorded_sqft == 0.0 {
        return CvDiscrepancy {
            delta: 0.0,
            unrecorded_expansion: false,
        };
    }
    let delta = round_to((cv_sqft - recorded_sqft) / recorded_sqft, 4);
    CvDiscrepancy {
        delta,
        unrecorded_expansion: delta > threshold,
    }
}

/// Whole years since construction; future build years count as new.
pub fn property_age(year_built: i32, current_year: i32) -> f64 {
    f64::from((current_year - year_built).max(0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum EntityType {
    #[default]
    Individual,
    #[serde(rename = "LLC")]
    Llc,
    Corporation,
    Trust,
    Other,
}

impl From<String> for EntityType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "individual" => EntityType::Individual,
            "llc" => EntityType::Llc,
            "corporation" | "corp" => EntityType::Corporation,
            "trust" => EntityType::Trust,
            _ => EntityType::Other,
        }
    }
}

impl EntityType {
    fn is_flagged(&self) -> bool {
        matches!(self, EntityType::Llc | EntityType::Corporation | EntityType::Trust)
    }
}

/// One deed in a property's chain of title.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OwnershipTransfer {
    #[serde(default)]
    pub sale_date: Option<NaiveDate>,
    #[serde(default)]
    pub entity_type: EntityType,
    #[serde(default)]
    pub holding_period_years: Option<f64>,
    #[serde(default)]
    pub purchase_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnershipAnomaly {
    pub score: f64,
    pub transfers_in_window: u32,
    pub avg_holding_period_years: Observation<f64>,
    pub flagged_entities: Vec<EntityType>,
}

impl OwnershipAnomaly {
    /// Copy the ownership signals into a factor record.
    pub fn apply_to(&self, record: &mut PropertyFactorRecord) {
        record.num_ownership_transfers_5yr = Observation::Value(self.transfers_in_window);
        record.avg_holding_period_years = self.avg_holding_period_years;
        record.ownership_anomaly_score = Observation::Value(self.score);
    }
}

/// Heuristic anomaly score for a chain of title, from 0 (clean) to 1.
///
/// Recent churn, short holds, entity-owned transfers and fast price
/// escalation raise the score; long average holds lower it. Returns `None`
/// for an empty history so the record keeps the factor unavailable.
///
/// A history with no holding periods at all gets no hold adjustment: the
/// average hold is reported as unknown rather than treated as a zero-year
/// hold, so the +0.20 short-hold term does not apply.
pub fn ownership_anomaly(
    history: &[OwnershipTransfer],
    lookback_years: i32,
    current_year: i32,
) -> Option<OwnershipAnomaly> {
    if history.is_empty() {
        return None;
    }

    let cutoff_year = current_year - lookback_years;
    let transfers_in_window = history
        .iter()
        .filter_map(|transfer| transfer.sale_date)
        .filter(|date| date.year() >= cutoff_year)
        .count() as u32;

    let holds: Vec<f64> = history
        .iter()
        .filter_map(|transfer| transfer.holding_period_years)
        .collect();
    let avg_hold = (!holds.is_empty())
        .then(|| round_to(holds.iter().sum::<f64>() / holds.len() as f64, 2));

    let flagged_entities: Vec<EntityType> = history
        .iter()
        .map(|transfer| transfer.entity_type)
        .filter(EntityType::is_flagged)
        .collect();
    let entity_ratio = flagged_entities.len() as f64 / history.len() as f64;

    let prices: Vec<f64> = history
        .iter()
        .filter_map(|transfer| transfer.purchase_price)
        .collect();
    let velocity = match (prices.first(), prices.last()) {
        (Some(first), Some(last)) if prices.len() >= 2 && *first > 0.0 => {
            let years = if holds.is_empty() {
                1.0
            } else {
                holds.iter().sum::<f64>().max(1.0)
            };
            (last - first) / (first * years)
        }
        _ => 0.0,
    };

    let hold_adjustment = match avg_hold {
        Some(hold) if hold < 2.0 => 0.20,
        Some(hold) if hold > 10.0 => -0.10,
        _ => 0.0,
    };

    let raw = 0.12 * f64::from(transfers_in_window)
        + hold_adjustment
        + 0.25 * entity_ratio
        + 0.15 * velocity.min(1.0);

    Some(OwnershipAnomaly {
        score: round_to(raw.clamp(0.0, 1.0), 3),
        transfers_in_window,
        avg_holding_period_years: avg_hold.into(),
        flagged_entities,
    })
}
