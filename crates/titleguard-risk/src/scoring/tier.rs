use serde::{Deserialize, Serialize};

/// Underwriting tier for an overall 0-100 score. Ordered from lowest to highest risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskTier {
    /// Tier for a score on the 0-100 scale.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskTier::Critical
        } else if score >= 60.0 {
            RiskTier::High
        } else if score >= 40.0 {
            RiskTier::Moderate
        } else if score >= 20.0 {
            RiskTier::Low
        } else {
            RiskTier::Minimal
        }
    }

    /// Tier for a 0-1 subscore, using the equivalent fractional thresholds.
    pub fn from_fraction(value: f64) -> Self {
        if value >= 0.8 {
            RiskTier::Critical
        } else if value >= 0.6 {
            RiskTier::High
        } else if value >= 0.4 {
            RiskTier::Moderate
        } else if value >= 0.2 {
            RiskTier::Low
        } else {
            RiskTier::Minimal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Minimal => "Minimal",
            RiskTier::Low => "Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High",
            RiskTier::Critical => "Critical",
        }
    }
}

/// Severity attached to a factor subscore. `Unavailable` marks factors whose
/// inputs never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
    Unavailable,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Minimal => "Minimal",
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
            Severity::Critical => "Critical",
            Severity::Unavailable => "Unavailable",
        }
    }
}

impl From<RiskTier> for Severity {
    fn from(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Minimal => Severity::Minimal,
            RiskTier::Low => Severity::Low,
            RiskTier::Moderate => Severity::Moderate,
            RiskTier::High => Severity::High,
            RiskTier::Critical => Severity::Critical,
        }
    }
}

/// Likelihood band for a closing delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DelayTier {
    Low,
    Medium,
    High,
}

impl DelayTier {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.6 {
            DelayTier::High
        } else if probability >= 0.3 {
            DelayTier::Medium
        } else {
            DelayTier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DelayTier::Low => "Low",
            DelayTier::Medium => "Medium",
            DelayTier::High => "High",
        }
    }
}
