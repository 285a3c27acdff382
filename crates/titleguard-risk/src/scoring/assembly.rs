use std::collections::BTreeMap;

use super::aggregate::WeightedAggregate;
use super::factor::FactorKind;
use super::interactions::InteractionSet;
use super::record::PropertyFactorRecord;
use super::result::{
    DelayAssessment, FactorSubscore, MlAssessment, RiskResult, ScoringMethod,
};
use super::tier::RiskTier;
use super::transforms::{
    clamp_cv_delta, clamp_distance, clamp_fraction, clamp_years, Subscores,
};
use super::{round_to, BlendWeights};

pub(crate) struct AssemblyInputs<'a> {
    pub record: &'a PropertyFactorRecord,
    pub subscores: &'a Subscores,
    pub interactions: InteractionSet,
    pub aggregate: &'a WeightedAggregate,
    pub ml: Option<MlAssessment>,
    pub delay: Option<DelayAssessment>,
    pub blend: BlendWeights,
}

pub(crate) fn assemble(inputs: AssemblyInputs<'_>) -> RiskResult {
    let AssemblyInputs {
        record,
        subscores,
        interactions,
        aggregate,
        ml,
        delay,
        blend,
    } = inputs;

    let (final_score, scoring_method) = match &ml {
        Some(assessment) => (
            blend.analytic * aggregate.score + blend.ml * assessment.probability * 100.0,
            ScoringMethod::Blended,
        ),
        None => (aggregate.score, ScoringMethod::WeightedOnly),
    };
    let overall_score = round_to(final_score.clamp(0.0, 100.0), 1);

    let factors = factor_breakdown(record, subscores, &aggregate.weights);

    RiskResult {
        overall_score,
        risk_tier: RiskTier::from_score(overall_score),
        factors,
        interactions: round_interactions(interactions),
        weighted_score: round_to(aggregate.score, 1),
        ml,
        delay,
        scoring_method,
    }
}

fn factor_breakdown(
    record: &PropertyFactorRecord,
    subscores: &Subscores,
    weights: &BTreeMap<FactorKind, f64>,
) -> BTreeMap<FactorKind, FactorSubscore> {
    FactorKind::ALL
        .iter()
        .map(|&kind| {
            let entry = match subscores.get(&kind).copied().flatten() {
                Some(score) => FactorSubscore::scored(
                    kind,
                    round_to(score, 4),
                    round_to(weights.get(&kind).copied().unwrap_or(0.0), 4),
                    describe(kind, record),
                ),
                None => FactorSubscore::unavailable(kind, describe_unavailable(kind)),
            };
            (kind, entry)
        })
        .collect()
}

fn round_interactions(mut interactions: InteractionSet) -> InteractionSet {
    for term in &mut interactions.terms {
        term.value = round_to(term.value, 4);
    }
    interactions.combined = round_to(interactions.combined, 4);
    interactions
}

fn describe(kind: FactorKind, record: &PropertyFactorRecord) -> String {
    match kind {
        FactorKind::Flood => {
            let zone = record.flood_zone_code.trim();
            let distance = clamp_distance(record.flood_boundary_distance_m);
            if record.inside_flood {
                format!("Parcel inside a FEMA Special Flood Hazard Area (zone {zone})")
            } else if distance <= 0.0 {
                format!("Parcel sits on the zone {zone} flood boundary")
            } else {
                format!("Zone {zone}; {distance:.0} m from the nearest flood boundary")
            }
        }
        FactorKind::Easement => format!(
            "{:.1}% of the structure encroaches on recorded easements",
            clamp_fraction(record.easement_encroachment_fraction) * 100.0
        ),
        FactorKind::LotCoverage => {
            let coverage = clamp_fraction(record.lot_coverage_fraction);
            let limit = clamp_fraction(record.zoning_max_coverage_fraction);
            let note = if coverage > limit { " (over limit)" } else { "" };
            format!(
                "Lot coverage {:.1}% against a {:.1}% zoning maximum{note}",
                coverage * 100.0,
                limit * 100.0
            )
        }
        FactorKind::Ownership => match record.ownership() {
            Some(signals) => format!(
                "{} transfer(s) in 5 years, {:.1}-year average hold, anomaly score {:.2}",
                signals.transfers,
                clamp_years(signals.avg_holding_period_years),
                clamp_fraction(signals.anomaly_score)
            ),
            None => describe_unavailable(kind),
        },
        FactorKind::PropertyAge => match record.property_age_years.value() {
            Some(age) => format!("Structure is {:.0} years old", clamp_years(age)),
            None => describe_unavailable(kind),
        },
        FactorKind::CvDiscrepancy => match record.cv_vs_recorded_area_delta.value() {
            Some(delta) => format!(
                "Imagery-measured building area differs from the recorded area by {:+.1}%",
                clamp_cv_delta(delta) * 100.0
            ),
            None => describe_unavailable(kind),
        },
    }
}

fn describe_unavailable(kind: FactorKind) -> String {
    let source = match kind {
        FactorKind::Ownership => "Ownership history",
        FactorKind::PropertyAge => "Year built",
        FactorKind::CvDiscrepancy => "Imagery area comparison",
        FactorKind::Flood | FactorKind::Easement | FactorKind::LotCoverage => kind.label(),
    };
    format!("{source} unavailable from upstream sources; not scored")
}
