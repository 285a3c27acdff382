use chrono::{Datelike, Local, NaiveDate};
use clap::Args;
use titleguard_risk::config::AppConfig;
use titleguard_risk::derived::{
    cv_discrepancy, easement_encroachment, lot_coverage, ownership_anomaly, property_age,
    EntityType, OwnershipTransfer, DEFAULT_EXPANSION_THRESHOLD, DEFAULT_LOOKBACK_YEARS,
};
use titleguard_risk::error::AppError;
use titleguard_risk::scoring::FactorKind;
use titleguard_risk::{ModelRegistry, Observation, PropertyFactorRecord, RiskEngine, RiskResult};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Year used for property age and the ownership lookback window (defaults to this year)
    #[arg(long)]
    pub(crate) current_year: Option<i32>,
    /// Skip the models and show the weighted aggregate only
    #[arg(long)]
    pub(crate) weighted_only: bool,
}

pub(crate) fn run_demo(args: DemoArgs, config: &AppConfig) -> Result<(), AppError> {
    let current_year = args.current_year.unwrap_or_else(|| Local::now().year());
    let registry = if args.weighted_only {
        ModelRegistry::disabled("weighted-only demo requested")
    } else {
        ModelRegistry::initialize(&config.models)
    };

    match registry.source() {
        Some(source) => println!("Models: {}", source.label()),
        None => println!(
            "Models: disabled ({})",
            registry.disabled_reason().unwrap_or("unknown")
        ),
    }

    let engine = RiskEngine::new();
    let scenarios = [
        ("Reference high-risk scenario", reference_scenario()),
        ("Flagged parcel (raw measurements)", flagged_parcel(current_year)),
        ("Sparse provider response", sparse_parcel()),
    ];
    for (title, record) in scenarios {
        let result = engine.score(&record, &registry);
        println!();
        for line in render_breakdown(title, &result) {
            println!("{line}");
        }
    }
    Ok(())
}

fn reference_scenario() -> PropertyFactorRecord {
    let mut record = PropertyFactorRecord::new("AE", true, 0.0, 0.30, 0.75);
    record.property_age_years = Observation::Value(50.0);
    record.num_ownership_transfers_5yr = Observation::Value(3);
    record.avg_holding_period_years = Observation::Value(1.5);
    record.ownership_anomaly_score = Observation::Value(0.6);
    record.cv_vs_recorded_area_delta = Observation::Value(0.20);
    record
}

/// Build a record the way an intake pipeline would, from measurements and
/// the chain of title.
fn flagged_parcel(current_year: i32) -> PropertyFactorRecord {
    let coverage = lot_coverage(4_160.0, 5_200.0, 0.70);
    let encroachment = easement_encroachment(4_160.0, 1_040.0);
    let cv = cv_discrepancy(4_950.0, 4_160.0, DEFAULT_EXPANSION_THRESHOLD);

    let mut record = PropertyFactorRecord::new("AE", true, 0.0, encroachment, coverage.ratio);
    record.property_age_years = Observation::Value(property_age(1974, current_year));
    record.cv_vs_recorded_area_delta = Observation::Value(cv.delta);

    let history = [
        transfer(current_year - 9, EntityType::Individual, 11.0, 280_000.0),
        transfer(current_year - 3, EntityType::Llc, 1.4, 345_000.0),
        transfer(current_year - 2, EntityType::Llc, 0.9, 410_000.0),
        transfer(current_year - 1, EntityType::Trust, 1.1, 465_000.0),
    ];
    if let Some(anomaly) = ownership_anomaly(&history, DEFAULT_LOOKBACK_YEARS, current_year) {
        anomaly.apply_to(&mut record);
    }
    record
}

fn sparse_parcel() -> PropertyFactorRecord {
    PropertyFactorRecord::new("X", false, 400.0, 0.02, 0.35)
}

fn transfer(year: i32, entity_type: EntityType, hold: f64, price: f64) -> OwnershipTransfer {
    OwnershipTransfer {
        sale_date: NaiveDate::from_ymd_opt(year, 6, 1),
        entity_type,
        holding_period_years: Some(hold),
        purchase_price: Some(price),
    }
}

fn render_breakdown(title: &str, result: &RiskResult) -> Vec<String> {
    let mut lines = vec![
        format!("== {title} =="),
        format!("Summary: {}", result.summary()),
        format!("Weighted score: {:.1}", result.weighted_score),
        "\nFactors".to_string(),
    ];

    for kind in FactorKind::ALL {
        let Some(factor) = result.factor(kind) else {
            continue;
        };
        let score = factor
            .score
            .map(|score| format!("{score:.3}"))
            .unwrap_or_else(|| "n/a".to_string());
        lines.push(format!(
            "- {}: {} (weight {:.3}, {}) {}",
            factor.label,
            score,
            factor.weight,
            factor.severity.label(),
            factor.description
        ));
    }

    lines.push("\nInteractions".to_string());
    lines.extend(result.interactions.terms.iter().map(|term| {
        let name = serde_json::to_value(term.name)
            .ok()
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", term.name));
        format!("- {name}: {:.3}", term.value)
    }));
    lines.push(format!("- combined: {:.3}", result.interactions.combined));

    match &result.ml {
        Some(ml) => {
            lines.push(format!("\nModel probability: {:.1}%", ml.probability * 100.0));
            if let Some(attribution) = &ml.attribution {
                lines.push(format!("Attribution base value: {:.3}", attribution.base_value));
                lines.extend(
                    attribution
                        .ranked()
                        .into_iter()
                        .take(3)
                        .map(|(name, value)| format!("- {name}: {value:+.3}")),
                );
            }
        }
        None => lines.push("\nModel probability: not available".to_string()),
    }

    if let Some(delay) = &result.delay {
        lines.push(format!(
            "Closing delay: {} ({:.1}%)",
            delay.tier.label(),
            delay.probability * 100.0
        ));
    }
    lines
}
