//! Types for the mining pipeline

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::rule::{AssociationRule, Recommendation, RuleMetric};
use crate::errors::DomainError;

use super::MiningResult;

/// Bounds on the worst-case cost of a mining run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiningLimits {
    /// Largest itemset size searched (`None` = up to the item universe size)
    pub max_itemset_len: Option<usize>,
    /// Largest number of candidates a single level may generate
    pub max_candidates: Option<usize>,
    /// Wall-clock budget, checked between levels
    pub time_budget: Option<Duration>,
}

impl MiningLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_itemset_len(mut self, max: usize) -> Self {
        self.max_itemset_len = Some(max);
        self
    }

    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = Some(max);
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

/// Parameters of one mining invocation
#[derive(Debug, Clone, PartialEq)]
pub struct MiningParams {
    /// Minimum support in `(0, 1]`
    pub min_support: f64,
    /// Metric compared against `min_threshold`
    pub metric: RuleMetric,
    /// Minimum metric value for a rule to be kept
    pub min_threshold: f64,
    /// Maximum recommendations returned per item
    pub top_k: usize,
    pub limits: MiningLimits,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_support: super::DEFAULT_MIN_SUPPORT,
            metric: RuleMetric::Lift,
            min_threshold: super::DEFAULT_MIN_THRESHOLD,
            top_k: super::DEFAULT_TOP_K,
            limits: MiningLimits::default(),
        }
    }
}

impl MiningParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_support(mut self, min_support: f64) -> Self {
        self.min_support = min_support;
        self
    }

    pub fn with_metric(mut self, metric: RuleMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_min_threshold(mut self, min_threshold: f64) -> Self {
        self.min_threshold = min_threshold;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_limits(mut self, limits: MiningLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Rejects out-of-range parameters. Nothing is clamped.
    pub fn validate(&self) -> MiningResult<()> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(DomainError::InvalidParameter(format!(
                "min_support must be in (0, 1], got {}",
                self.min_support
            )));
        }

        if !self.min_threshold.is_finite() {
            return Err(DomainError::InvalidParameter(format!(
                "min_threshold must be a finite number, got {}",
                self.min_threshold
            )));
        }

        if self.top_k == 0 {
            return Err(DomainError::InvalidParameter(
                "top_k must be greater than zero".to_owned(),
            ));
        }

        if self.limits.max_itemset_len == Some(0) {
            return Err(DomainError::InvalidParameter(
                "max_itemset_len must be greater than zero when set".to_owned(),
            ));
        }

        if self.limits.max_candidates == Some(0) {
            return Err(DomainError::InvalidParameter(
                "max_candidates must be greater than zero when set".to_owned(),
            ));
        }

        Ok(())
    }
}

/// Full rule listing payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<AssociationRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RulesResponse {
    pub fn found(rules: Vec<AssociationRule>) -> Self {
        let rules_count = rules.len();
        Self { success: true, rules: Some(rules), rules_count: Some(rules_count), message: None }
    }

    pub fn diagnostic(message: impl Into<String>) -> Self {
        Self { success: false, rules: None, rules_count: None, message: Some(message.into()) }
    }
}

/// Item recommendation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub success: bool,
    pub item_id: String,
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecommendationResponse {
    pub fn found(item_id: impl Into<String>, recommendations: Vec<Recommendation>) -> Self {
        Self { success: true, item_id: item_id.into(), recommendations, message: None }
    }

    pub fn diagnostic(item_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            item_id: item_id.into(),
            recommendations: Vec::new(),
            message: Some(message.into()),
        }
    }
}
