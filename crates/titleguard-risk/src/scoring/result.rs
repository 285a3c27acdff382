use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::factor::FactorKind;
use super::interactions::InteractionSet;
use super::tier::{DelayTier, RiskTier, Severity};

/// Breakdown entry for one factor, suitable for audit trails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSubscore {
    pub score: Option<f64>,
    pub weight: f64,
    pub label: String,
    pub severity: Severity,
    pub description: String,
    pub unavailable: bool,
}

impl FactorSubscore {
    pub(crate) fn scored(kind: FactorKind, score: f64, weight: f64, description: String) -> Self {
        Self {
            score: Some(score),
            weight,
            label: kind.label().to_string(),
            severity: RiskTier::from_fraction(score).into(),
            description,
            unavailable: false,
        }
    }

    /// Sentinel for factors whose inputs never arrived. Carries no value so
    /// downstream narrators cannot state anything about the missing data.
    pub(crate) fn unavailable(kind: FactorKind, description: String) -> Self {
        Self {
            score: None,
            weight: 0.0,
            label: kind.label().to_string(),
            severity: Severity::Unavailable,
            description,
            unavailable: true,
        }
    }
}

/// Shapley attribution in log-odds space. `base_value` plus the sum of
/// `contributions` equals the classifier margin for this property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapAttribution {
    pub base_value: f64,
    pub contributions: BTreeMap<String, f64>,
}

impl ShapAttribution {
    /// Features ordered by absolute contribution, strongest first.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .contributions
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then(a.0.cmp(b.0)));
        ranked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlAssessment {
    pub probability: f64,
    pub feature_importances: BTreeMap<String, f64>,
    pub attribution: Option<ShapAttribution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayAssessment {
    pub probability: f64,
    pub tier: DelayTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    Blended,
    WeightedOnly,
}

impl ScoringMethod {
    pub fn label(self) -> &'static str {
        match self {
            ScoringMethod::Blended => "blended",
            ScoringMethod::WeightedOnly => "weighted_only",
        }
    }
}

/// Final output of the engine for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub overall_score: f64,
    pub risk_tier: RiskTier,
    pub factors: BTreeMap<FactorKind, FactorSubscore>,
    pub interactions: InteractionSet,
    pub weighted_score: f64,
    pub ml: Option<MlAssessment>,
    pub delay: Option<DelayAssessment>,
    pub scoring_method: ScoringMethod,
}

impl RiskResult {
    pub fn factor(&self, kind: FactorKind) -> Option<&FactorSubscore> {
        self.factors.get(&kind)
    }

    pub fn unavailable_factors(&self) -> Vec<FactorKind> {
        self.factors
            .iter()
            .filter(|(_, subscore)| subscore.unavailable)
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} risk ({:.1}/100, {})",
            self.risk_tier.label(),
            self.overall_score,
            self.scoring_method.label()
        );
        if let Some(delay) = &self.delay {
            summary.push_str(&format!(
                "; closing delay {} ({:.0}%)",
                delay.tier.label(),
                delay.probability * 100.0
            ));
        }
        let missing = self.unavailable_factors();
        if !missing.is_empty() {
            let labels: Vec<&str> = missing.iter().map(|kind| kind.label()).collect();
            summary.push_str(&format!("; not scored: {}", labels.join(", ")));
        }
        summary
    }
}
