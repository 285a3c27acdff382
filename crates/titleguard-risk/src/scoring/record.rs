use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default zoning lot-coverage cap used when the jurisdiction is unknown.
pub const DEFAULT_ZONING_MAX_COVERAGE: f64 = 0.70;

/// A value reported by an upstream provider, or an explicit marker that the
/// provider returned nothing.
///
/// Serialized as the bare value or `null`; absent JSON keys deserialize to
/// [`Observation::Unavailable`] when the field carries `#[serde(default)]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation<T> {
    Value(T),
    Unavailable,
}

impl<T> Observation<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Observation::Value(_))
    }

    pub fn as_ref(&self) -> Observation<&T> {
        match self {
            Observation::Value(value) => Observation::Value(value),
            Observation::Unavailable => Observation::Unavailable,
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Observation::Value(value) => Some(value),
            Observation::Unavailable => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Observation<U> {
        match self {
            Observation::Value(value) => Observation::Value(f(value)),
            Observation::Unavailable => Observation::Unavailable,
        }
    }

    /// Neutral stand-in for model inputs only. Never use for reported values.
    pub(crate) fn or_neutral(self, neutral: T) -> T {
        self.value().unwrap_or(neutral)
    }
}

impl<T> Default for Observation<T> {
    fn default() -> Self {
        Observation::Unavailable
    }
}

impl<T> From<Option<T>> for Observation<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Observation::Value(value),
            None => Observation::Unavailable,
        }
    }
}

impl<T: Serialize> Serialize for Observation<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Observation::Value(value) => serializer.serialize_some(value),
            Observation::Unavailable => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Observation<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Observation::from)
    }
}

/// Derived risk factors for a single property, as handed over by the upstream
/// aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFactorRecord {
    pub flood_zone_code: String,
    pub inside_flood: bool,
    pub flood_boundary_distance_m: f64,
    pub easement_encroachment_fraction: f64,
    pub lot_coverage_fraction: f64,
    #[serde(default = "default_zoning_max_coverage")]
    pub zoning_max_coverage_fraction: f64,
    #[serde(default)]
    pub property_age_years: Observation<f64>,
    #[serde(default)]
    pub num_ownership_transfers_5yr: Observation<u32>,
    #[serde(default)]
    pub avg_holding_period_years: Observation<f64>,
    #[serde(default)]
    pub ownership_anomaly_score: Observation<f64>,
    #[serde(default)]
    pub cv_vs_recorded_area_delta: Observation<f64>,
}

fn default_zoning_max_coverage() -> f64 {
    DEFAULT_ZONING_MAX_COVERAGE
}

/// Ownership inputs, present only when every ownership field was reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnershipSignals {
    pub transfers: u32,
    pub avg_holding_period_years: f64,
    pub anomaly_score: f64,
}

impl PropertyFactorRecord {
    /// Record with the required factors set and every optional factor unavailable.
    pub fn new(
        flood_zone_code: impl Into<String>,
        inside_flood: bool,
        flood_boundary_distance_m: f64,
        easement_encroachment_fraction: f64,
        lot_coverage_fraction: f64,
    ) -> Self {
        Self {
            flood_zone_code: flood_zone_code.into(),
            inside_flood,
            flood_boundary_distance_m,
            easement_encroachment_fraction,
            lot_coverage_fraction,
            zoning_max_coverage_fraction: DEFAULT_ZONING_MAX_COVERAGE,
            property_age_years: Observation::Unavailable,
            num_ownership_transfers_5yr: Observation::Unavailable,
            avg_holding_period_years: Observation::Unavailable,
            ownership_anomaly_score: Observation::Unavailable,
            cv_vs_recorded_area_delta: Observation::Unavailable,
        }
    }

    pub fn ownership(&self) -> Option<OwnershipSignals> {
        match (
            self.num_ownership_transfers_5yr,
            self.avg_holding_period_years,
            self.ownership_anomaly_score,
        ) {
            (
                Observation::Value(transfers),
                Observation::Value(avg_holding_period_years),
                Observation::Value(anomaly_score),
            ) => Some(OwnershipSignals {
                transfers,
                avg_holding_period_years,
                anomaly_score,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_null_optionals_deserialize_as_unavailable() {
        let json = r#"{
            "flood_zone_code": "X",
            "inside_flood": false,
            "flood_boundary_distance_m": 120.0,
            "easement_encroachment_fraction": 0.05,
            "lot_coverage_fraction": 0.4,
            "property_age_years": null,
            "num_ownership_transfers_5yr": 2
        }"#;

        let record: PropertyFactorRecord = serde_json::from_str(json).expect("record parses");

        assert_eq!(record.zoning_max_coverage_fraction, DEFAULT_ZONING_MAX_COVERAGE);
        assert_eq!(record.property_age_years, Observation::Unavailable);
        assert_eq!(record.num_ownership_transfers_5yr, Observation::Value(2));
        assert_eq!(record.cv_vs_recorded_area_delta, Observation::Unavailable);
        assert!(record.ownership().is_none());
    }

    #[test]
    fn unavailable_serializes_as_null() {
        let record = PropertyFactorRecord::new("AE", true, 0.0, 0.1, 0.5);
        let value = serde_json::to_value(&record).expect("serializes");
        assert!(value["property_age_years"].is_null());
        assert!(value["ownership_anomaly_score"].is_null());
    }

    #[test]
    fn ownership_requires_every_field() {
        let mut record = PropertyFactorRecord::new("X", false, 50.0, 0.0, 0.3);
        record.num_ownership_transfers_5yr = Observation::Value(1);
        record.ownership_anomaly_score = Observation::Value(0.2);
        assert!(record.ownership().is_none());

        record.avg_holding_period_years = Observation::Value(6.5);
        let signals = record.ownership().expect("all ownership fields present");
        assert_eq!(signals.transfers, 1);
        assert_eq!(signals.avg_holding_period_years, 6.5);
    }
}
