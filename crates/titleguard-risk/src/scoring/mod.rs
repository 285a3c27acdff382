//! Risk scoring pipeline: factor transforms, interactions, weighted
//! aggregation, model blending and result assembly.

pub mod aggregate;
mod assembly;
pub mod factor;
pub mod interactions;
pub mod record;
pub mod result;
pub mod tier;
pub mod transforms;

#[cfg(test)]
mod tests;

pub use factor::FactorKind;
pub use interactions::{InteractionKind, InteractionSet, InteractionTerm};
pub use record::{Observation, OwnershipSignals, PropertyFactorRecord, DEFAULT_ZONING_MAX_COVERAGE};
pub use result::{
    DelayAssessment, FactorSubscore, MlAssessment, RiskResult, ScoringMethod, ShapAttribution,
};
pub use tier::{DelayTier, RiskTier, Severity};

use crate::model::{FeatureVector, ModelArtifacts, ModelRegistry};
use assembly::AssemblyInputs;
use tracing::{debug, warn};

/// Share of the analytic score and of the ML probability in a blended score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub analytic: f64,
    pub ml: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            analytic: 0.70,
            ml: 0.30,
        }
    }
}

/// Stateless scorer. Models are borrowed from the registry on every call.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    blend: BlendWeights,
}

impl RiskEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blend(blend: BlendWeights) -> Self {
        Self { blend }
    }

    /// Score a property. Never fails: missing inputs and model problems
    /// shrink the result instead of aborting it.
    pub fn score(&self, record: &PropertyFactorRecord, registry: &ModelRegistry) -> RiskResult {
        let subscores = transforms::compute_subscores(record);
        let interactions = interactions::compute_interactions(&subscores);
        let aggregate = aggregate::aggregate(&subscores, &interactions);

        let (ml, delay) = match registry.artifacts() {
            Some(artifacts) => {
                let features = FeatureVector::from_record(record);
                (
                    Some(assess_ml(artifacts, &features)),
                    Some(assess_delay(artifacts, &features)),
                )
            }
            None => (None, None),
        };

        let result = assembly::assemble(AssemblyInputs {
            record,
            subscores: &subscores,
            interactions,
            aggregate: &aggregate,
            ml,
            delay,
            blend: self.blend,
        });

        debug!(
            overall_score = result.overall_score,
            weighted_score = result.weighted_score,
            method = result.scoring_method.label(),
            "scored property"
        );

        result
    }
}

fn assess_ml(artifacts: &ModelArtifacts, features: &FeatureVector) -> MlAssessment {
    let probability = artifacts.risk_probability(features);

    let attribution = match artifacts.explain(features) {
        Ok(values) => Some(ShapAttribution {
            base_value: values.base_value,
            contributions: values.named(),
        }),
        Err(err) => {
            warn!(%err, "dropping Shapley attribution");
            None
        }
    };

    MlAssessment {
        probability: round_to(probability, 4),
        feature_importances: artifacts
            .feature_importances()
            .into_iter()
            .map(|(name, value)| (name, round_to(value, 4)))
            .collect(),
        attribution,
    }
}

fn assess_delay(artifacts: &ModelArtifacts, features: &FeatureVector) -> DelayAssessment {
    let probability = round_to(artifacts.delay_probability(features), 4);
    DelayAssessment {
        probability,
        tier: DelayTier::from_probability(probability),
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
