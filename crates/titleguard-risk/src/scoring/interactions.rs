use serde::{Deserialize, Serialize};

use super::factor::FactorKind;
use super::transforms::Subscores;

/// Compounding effects between pairs of factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    /// Structures near the coverage cap that also sit in an easement.
    #[serde(rename = "coverage_x_easement")]
    CoverageEasement,
    /// Flood exposure on a parcel with irregular ownership.
    #[serde(rename = "flood_x_ownership")]
    FloodOwnership,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionTerm {
    pub name: InteractionKind,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSet {
    pub terms: Vec<InteractionTerm>,
    pub combined: f64,
}

impl InteractionSet {
    pub fn get(&self, kind: InteractionKind) -> Option<f64> {
        self.terms
            .iter()
            .find(|term| term.name == kind)
            .map(|term| term.value)
    }
}

/// `combined = 0.5 * coverage*easement + 0.5 * flood*ownership`; an
/// unavailable ownership factor contributes nothing.
pub fn compute_interactions(subscores: &Subscores) -> InteractionSet {
    let score = |kind: FactorKind| subscores.get(&kind).copied().flatten();

    let coverage_easement =
        score(FactorKind::LotCoverage).unwrap_or(0.0) * score(FactorKind::Easement).unwrap_or(0.0);
    let flood_ownership = match score(FactorKind::Ownership) {
        Some(ownership) => score(FactorKind::Flood).unwrap_or(0.0) * ownership,
        None => 0.0,
    };

    InteractionSet {
        terms: vec![
            InteractionTerm {
                name: InteractionKind::CoverageEasement,
                value: coverage_easement,
            },
            InteractionTerm {
                name: InteractionKind::FloodOwnership,
                value: flood_ownership,
            },
        ],
        combined: 0.5 * coverage_easement + 0.5 * flood_ownership,
    }
}
