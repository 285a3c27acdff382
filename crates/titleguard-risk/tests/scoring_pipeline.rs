use chrono::NaiveDate;
use titleguard_risk::derived::{
    cv_discrepancy, easement_encroachment, lot_coverage, ownership_anomaly, property_age,
    EntityType, OwnershipTransfer, DEFAULT_EXPANSION_THRESHOLD, DEFAULT_LOOKBACK_YEARS,
};
use titleguard_risk::scoring::{FactorKind, ScoringMethod, Severity};
use titleguard_risk::{ModelRegistry, Observation, PropertyFactorRecord, RiskEngine, RiskTier};

fn sale(year: i32, entity_type: EntityType, hold: f64, price: f64) -> OwnershipTransfer {
    OwnershipTransfer {
        sale_date: NaiveDate::from_ymd_opt(year, 6, 1),
        entity_type,
        holding_period_years: Some(hold),
        purchase_price: Some(price),
    }
}

#[test]
fn json_record_scores_into_json_result() {
    let input = r#"{
        "flood_zone_code": "AE",
        "inside_flood": true,
        "flood_boundary_distance_m": 0.0,
        "easement_encroachment_fraction": 0.30,
        "lot_coverage_fraction": 0.75,
        "zoning_max_coverage_fraction": 0.70,
        "property_age_years": 50,
        "num_ownership_transfers_5yr": 3,
        "avg_holding_period_years": 1.5,
        "ownership_anomaly_score": 0.6,
        "cv_vs_recorded_area_delta": 0.20
    }"#;
    let record: PropertyFactorRecord = serde_json::from_str(input).expect("record parses");
    let registry = ModelRegistry::disabled("integration test");

    let result = RiskEngine::new().score(&record, &registry);
    let output = serde_json::to_value(&result).expect("result serializes");

    assert_eq!(output["overall_score"], 89.9);
    assert_eq!(output["risk_tier"], "Critical");
    assert_eq!(output["scoring_method"], "weighted_only");
    assert_eq!(output["factors"]["flood_risk"]["score"], 1.0);
    assert_eq!(output["factors"]["flood_risk"]["severity"], "Critical");
    assert_eq!(output["factors"].as_object().map(|factors| factors.len()), Some(6));
}

#[test]
fn raw_measurements_flow_through_the_derived_calculators() {
    let coverage = lot_coverage(4_160.0, 5_200.0, 0.70);
    let encroachment = easement_encroachment(4_160.0, 520.0);
    let cv = cv_discrepancy(4_700.0, 4_160.0, DEFAULT_EXPANSION_THRESHOLD);
    assert!(coverage.over_limit);
    assert!(cv.unrecorded_expansion);

    let mut record = PropertyFactorRecord::new("X", false, 35.0, encroachment, coverage.ratio);
    record.property_age_years = Observation::Value(property_age(1962, 2026));
    record.cv_vs_recorded_area_delta = Observation::Value(cv.delta);

    let history = [
        sale(2012, EntityType::Individual, 9.0, 310_000.0),
        sale(2021, EntityType::Llc, 1.1, 395_000.0),
        sale(2022, EntityType::Llc, 1.4, 470_000.0),
        sale(2024, EntityType::Trust, 0.9, 515_000.0),
    ];
    let anomaly =
        ownership_anomaly(&history, DEFAULT_LOOKBACK_YEARS, 2026).expect("history present");
    anomaly.apply_to(&mut record);

    let result = RiskEngine::new().score(&record, &ModelRegistry::disabled("integration test"));

    assert!(result.unavailable_factors().is_empty());
    let ownership = result.factor(FactorKind::Ownership).expect("ownership reported");
    assert!(ownership.score.is_some());
    assert_ne!(ownership.severity, Severity::Unavailable);
    assert!(result.overall_score > 40.0, "{}", result.overall_score);
    assert!(result.risk_tier >= RiskTier::Moderate);
}

#[test]
fn sparse_records_are_scored_without_inventing_data() {
    let record = PropertyFactorRecord::new("X", false, 900.0, 0.0, 0.30);
    let result = RiskEngine::new().score(&record, &ModelRegistry::disabled("integration test"));

    assert_eq!(result.scoring_method, ScoringMethod::WeightedOnly);
    assert_eq!(result.unavailable_factors().len(), 3);
    assert!(result.summary().starts_with("Minimal risk"));
    assert!(result.summary().contains("not scored"));
}
