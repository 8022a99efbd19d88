use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Rule metric compared against `min_threshold` when deciding which rules to keep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMetric {
    Support,
    Confidence,
    #[default]
    Lift,
}

impl RuleMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Confidence => "confidence",
            Self::Lift => "lift",
        }
    }

    /// Reads the metric value off a scored rule.
    pub fn value_of(&self, support: f64, confidence: f64, lift: f64) -> f64 {
        match self {
            Self::Support => support,
            Self::Confidence => confidence,
            Self::Lift => lift,
        }
    }
}

impl fmt::Display for RuleMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleMetric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "support" => Ok(Self::Support),
            "confidence" => Ok(Self::Confidence),
            "lift" => Ok(Self::Lift),
            other => {
                Err(format!("unsupported rule metric `{other}` (expected support|confidence|lift)"))
            }
        }
    }
}

/// Association rule `antecedents => consequents`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedents: Vec<String>,
    pub consequents: Vec<String>,
    /// Support of `antecedents ∪ consequents`.
    pub support: f64,
    /// `support(antecedents ∪ consequents) / support(antecedents)`.
    pub confidence: f64,
    /// `confidence / support(consequents)`, clamped to the lift sentinel when degenerate.
    pub lift: f64,
}

impl AssociationRule {
    pub fn has_antecedent(&self, item: &str) -> bool {
        self.antecedents.iter().any(|candidate| candidate == item)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item: String,
    pub confidence: f64,
    pub lift: f64,
}
