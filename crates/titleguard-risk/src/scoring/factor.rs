use serde::{Deserialize, Serialize};

/// Risk factors scored by the engine, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FactorKind {
    #[serde(rename = "flood_risk")]
    Flood,
    #[serde(rename = "easement_impact")]
    Easement,
    #[serde(rename = "lot_coverage")]
    LotCoverage,
    #[serde(rename = "ownership_irregularity")]
    Ownership,
    #[serde(rename = "property_age")]
    PropertyAge,
    #[serde(rename = "cv_discrepancy")]
    CvDiscrepancy,
}

impl FactorKind {
    pub const ALL: [FactorKind; 6] = [
        FactorKind::Flood,
        FactorKind::Easement,
        FactorKind::LotCoverage,
        FactorKind::Ownership,
        FactorKind::PropertyAge,
        FactorKind::CvDiscrepancy,
    ];

    /// Weight before renormalization. The six base weights sum to 1.0.
    pub fn base_weight(self) -> f64 {
        match self {
            FactorKind::Flood => 0.25,
            FactorKind::Easement => 0.20,
            FactorKind::LotCoverage => 0.20,
            FactorKind::Ownership => 0.15,
            FactorKind::PropertyAge => 0.10,
            FactorKind::CvDiscrepancy => 0.10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FactorKind::Flood => "Flood Zone Exposure",
            FactorKind::Easement => "Easement Encroachment",
            FactorKind::LotCoverage => "Lot Coverage Risk",
            FactorKind::Ownership => "Ownership Irregularity",
            FactorKind::PropertyAge => "Property Age Risk",
            FactorKind::CvDiscrepancy => "Recorded Area Discrepancy",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            FactorKind::Flood => "flood_risk",
            FactorKind::Easement => "easement_impact",
            FactorKind::LotCoverage => "lot_coverage",
            FactorKind::Ownership => "ownership_irregularity",
            FactorKind::PropertyAge => "property_age",
            FactorKind::CvDiscrepancy => "cv_discrepancy",
        }
    }

    /// Whether the factor depends on inputs that upstream providers may omit.
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            FactorKind::Ownership | FactorKind::PropertyAge | FactorKind::CvDiscrepancy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_weights_sum_to_one() {
        let total: f64 = FactorKind::ALL.iter().map(|kind| kind.base_weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn serde_key_matches_reporting_key() {
        for kind in FactorKind::ALL {
            let json = serde_json::to_string(&kind).expect("serializes");
            assert_eq!(json, format!("\"{}\"", kind.key()));
        }
    }
}
