use std::collections::BTreeMap;

use super::factor::FactorKind;
use super::interactions::InteractionSet;
use super::transforms::Subscores;

/// Scale applied to the combined interaction term before it is added on top
/// of the weighted subscores.
pub const INTERACTION_BOOST: f64 = 0.15;

/// Analytic score together with the weights that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedAggregate {
    /// Renormalized weights of the factors that were scored.
    pub weights: BTreeMap<FactorKind, f64>,
    pub weighted_raw: f64,
    pub interaction_boost: f64,
    /// Analytic score on the 0-100 scale.
    pub score: f64,
}

/// Base weights of the available factors, rescaled to sum to one.
pub fn normalized_weights<I>(available: I) -> BTreeMap<FactorKind, f64>
where
    I: IntoIterator<Item = FactorKind>,
{
    let base: BTreeMap<FactorKind, f64> = available
        .into_iter()
        .map(|kind| (kind, kind.base_weight()))
        .collect();
    let total: f64 = base.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }

    base.into_iter()
        .map(|(kind, weight)| (kind, weight / total))
        .collect()
}

pub fn aggregate(subscores: &Subscores, interactions: &InteractionSet) -> WeightedAggregate {
    let weights = normalized_weights(
        subscores
            .iter()
            .filter(|(_, score)| score.is_some())
            .map(|(kind, _)| *kind),
    );

    let weighted_raw: f64 = weights
        .iter()
        .filter_map(|(kind, weight)| {
            subscores
                .get(kind)
                .copied()
                .flatten()
                .map(|score| weight * score)
        })
        .sum();

    let interaction_boost = INTERACTION_BOOST * interactions.combined;
    let score = ((weighted_raw + interaction_boost) * 100.0).clamp(0.0, 100.0);

    WeightedAggregate {
        weights,
        weighted_raw,
        interaction_boost,
        score,
    }
}
