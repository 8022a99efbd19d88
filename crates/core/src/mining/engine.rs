//! Market basket engine: runs the full mining pipeline for one request

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::rule::Recommendation;
use crate::domain::transaction::TransactionRecord;
use crate::errors::DomainError;

use super::apriori::FrequentItemsetMiner;
use super::cache::{CacheKey, RuleCache, SnapshotVersion};
use super::matrix::BasketMatrix;
use super::ranker::RecommendationRanker;
use super::rules::{RuleGenerator, RuleSet};
use super::types::{MiningParams, RecommendationResponse, RulesResponse};
use super::MiningResult;

/// Mines association rules and item recommendations from transaction records.
///
/// The engine holds no data of its own: every call receives a snapshot of the
/// records and runs the pipeline from scratch, unless a [`RuleCache`] is
/// attached and already holds the result for the same snapshot and parameters.
#[derive(Debug, Clone, Default)]
pub struct MarketBasketEngine {
    params: MiningParams,
    cache: Option<Arc<RuleCache>>,
}

impl MarketBasketEngine {
    pub fn new(params: MiningParams) -> Self {
        Self { params, cache: None }
    }

    pub fn with_cache(mut self, cache: Arc<RuleCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn params(&self) -> &MiningParams {
        &self.params
    }

    /// Builds the basket matrix, mines frequent itemsets and keeps the rules
    /// that clear the configured metric threshold.
    pub fn mine_rules(&self, records: &[TransactionRecord]) -> MiningResult<Arc<RuleSet>> {
        self.params.validate()?;
        if records.is_empty() {
            return Err(DomainError::EmptyInput);
        }

        let cache_key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(SnapshotVersion::of(records), &self.params));
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(hit) = cache.get(key) {
                debug!(
                    event_name = "mining.cache.hit",
                    snapshot = %key.version(),
                    rules = hit.len(),
                    "serving rule set from cache"
                );
                return Ok(hit);
            }
        }

        let matrix = BasketMatrix::build(records)?;
        let itemsets = FrequentItemsetMiner::new(self.params.min_support)
            .with_limits(self.params.limits.clone())
            .mine(&matrix)?;
        if itemsets.is_empty() {
            return Err(DomainError::NoFrequentItemsets { min_support: self.params.min_support });
        }

        let rules =
            RuleGenerator::new(self.params.metric, self.params.min_threshold).generate(&itemsets)?;
        if rules.is_empty() {
            return Err(DomainError::NoRulesFound {
                metric: self.params.metric,
                min_threshold: self.params.min_threshold,
            });
        }

        let rule_set = Arc::new(RuleSet::resolve(&matrix, &itemsets, rules));
        info!(
            event_name = "mining.rules.generated",
            transactions = rule_set.transaction_count,
            items = rule_set.item_count,
            frequent_itemsets = rule_set.frequent_itemsets.len(),
            rules = rule_set.len(),
            min_support = self.params.min_support,
            metric = %self.params.metric,
            min_threshold = self.params.min_threshold,
            "association rules generated"
        );

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.insert(key, Arc::clone(&rule_set));
        }

        Ok(rule_set)
    }

    /// Top-k recommendations for `item_id`, ranked by lift.
    pub fn recommend(
        &self,
        records: &[TransactionRecord],
        item_id: &str,
    ) -> MiningResult<Vec<Recommendation>> {
        let rule_set = self.mine_rules(records)?;
        let recommendations = RecommendationRanker::new(self.params.top_k).rank(item_id, &rule_set.rules);
        if recommendations.is_empty() {
            return Err(DomainError::NoMatchingRules { item_id: item_id.to_owned() });
        }

        debug!(
            event_name = "mining.recommendations.ranked",
            item_id,
            returned = recommendations.len(),
            "recommendations ranked"
        );
        Ok(recommendations)
    }

    /// Full rule listing; "nothing found" outcomes become a diagnostic payload.
    pub fn rules_response(&self, records: &[TransactionRecord]) -> MiningResult<RulesResponse> {
        match self.mine_rules(records) {
            Ok(rule_set) => Ok(RulesResponse::found(rule_set.rules.clone())),
            Err(error) if error.is_empty_outcome() => Ok(RulesResponse::diagnostic(error.to_string())),
            Err(error) => Err(error),
        }
    }

    pub fn recommendations_response(
        &self,
        records: &[TransactionRecord],
        item_id: &str,
    ) -> MiningResult<RecommendationResponse> {
        match self.recommend(records, item_id) {
            Ok(recommendations) => Ok(RecommendationResponse::found(item_id, recommendations)),
            Err(error) if error.is_empty_outcome() => {
                Ok(RecommendationResponse::diagnostic(item_id, error.to_string()))
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::rule::RuleMetric;
    use crate::mining::types::MiningLimits;

    fn records(baskets: &[(&str, &[&str])]) -> Vec<TransactionRecord> {
        baskets
            .iter()
            .flat_map(|(txn, items)| items.iter().map(move |item| TransactionRecord::new(*txn, *item)))
            .collect()
    }

    fn grocery_records() -> Vec<TransactionRecord> {
        records(&[
            ("1", &["Milk", "Bread", "Butter"]),
            ("2", &["Milk", "Bread"]),
            ("3", &["Milk", "Bread", "Butter"]),
            ("4", &["Eggs", "Tea"]),
            ("5", &["Eggs", "Tea", "Sugar"]),
            ("6", &["Milk", "Butter"]),
        ])
    }

    #[test]
    fn empty_input_is_a_diagnostic_not_an_error() {
        let engine = MarketBasketEngine::default();

        assert_eq!(engine.mine_rules(&[]).map(|_| ()), Err(DomainError::EmptyInput));

        let response = engine.rules_response(&[]).expect("empty input should be a diagnostic");
        assert!(!response.success);
        assert!(response.rules.is_none());
        assert!(response.message.is_some());
    }

    #[test]
    fn invalid_parameters_are_rejected_before_data_checks() {
        let engine = MarketBasketEngine::new(MiningParams::new().with_min_support(0.0));

        let error = engine.rules_response(&[]).expect_err("bad params should fail");
        assert!(matches!(error, DomainError::InvalidParameter(_)));
    }

    #[test]
    fn support_threshold_above_every_item_reports_no_frequent_itemsets() {
        let engine = MarketBasketEngine::new(MiningParams::new().with_min_support(0.9));

        let error = engine.mine_rules(&grocery_records()).map(|_| ()).expect_err("nothing frequent");
        assert_eq!(error, DomainError::NoFrequentItemsets { min_support: 0.9 });

        let response = engine.rules_response(&grocery_records()).expect("diagnostic");
        assert!(!response.success);
        assert!(response.message.is_some_and(|message| message.contains("lowering")));
    }

    #[test]
    fn singletons_only_reports_no_rules() {
        let engine = MarketBasketEngine::new(MiningParams::new().with_min_support(0.5));
        let data = records(&[("1", &["A"]), ("2", &["B"]), ("3", &["A"]), ("4", &["B"])]);

        let error = engine.mine_rules(&data).map(|_| ()).expect_err("no pairs are frequent");
        assert!(matches!(error, DomainError::NoRulesFound { .. }));
    }

    #[test]
    fn rules_response_lists_every_rule_with_a_count() {
        let engine = MarketBasketEngine::new(MiningParams::new().with_min_support(0.3));

        let response = engine.rules_response(&grocery_records()).expect("rules should be mined");
        assert!(response.success);
        let rules = response.rules.expect("rules present");
        assert_eq!(response.rules_count, Some(rules.len()));
        assert!(rules.iter().all(|rule| rule.lift >= 1.0));
        assert!(rules
            .iter()
            .any(|rule| rule.antecedents == ["Eggs"] && rule.consequents == ["Tea"]));
    }

    #[test]
    fn recommendations_are_ranked_and_truncated() {
        let engine = MarketBasketEngine::new(
            MiningParams::new().with_min_support(0.3).with_min_threshold(0.0).with_top_k(2),
        );

        let recommendations = engine.recommend(&grocery_records(), "Milk").expect("milk has rules");
        assert_eq!(recommendations.len(), 2);
        assert!(recommendations[0].lift >= recommendations[1].lift);
        assert!(recommendations.iter().all(|recommendation| recommendation.item != "Milk"));
    }

    #[test]
    fn unknown_item_is_reported_as_diagnostic() {
        let engine = MarketBasketEngine::new(MiningParams::new().with_min_support(0.3));

        let response =
            engine.recommendations_response(&grocery_records(), "Caviar").expect("diagnostic");
        assert!(!response.success);
        assert_eq!(response.item_id, "Caviar");
        assert!(response.recommendations.is_empty());
        assert!(response.message.is_some_and(|message| message.contains("Caviar")));
    }

    #[test]
    fn budget_errors_are_not_diagnostics() {
        let engine = MarketBasketEngine::new(
            MiningParams::new()
                .with_min_support(0.1)
                .with_limits(MiningLimits::unbounded().with_time_budget(Duration::ZERO)),
        );

        let error = engine.rules_response(&grocery_records()).expect_err("deadline should trip");
        assert!(error.is_budget_exhausted());
    }

    #[test]
    fn cached_engine_reuses_rule_sets_per_snapshot() {
        let cache = Arc::new(RuleCache::default());
        let engine = MarketBasketEngine::new(MiningParams::new().with_min_support(0.3))
            .with_cache(Arc::clone(&cache));

        let first = engine.mine_rules(&grocery_records()).expect("first run");
        let second = engine.mine_rules(&grocery_records()).expect("second run");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let mut changed = grocery_records();
        changed.push(TransactionRecord::new("7", "Milk"));
        let third = engine.mine_rules(&changed).expect("third run");
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn diagnostics_are_not_cached() {
        let cache = Arc::new(RuleCache::default());
        let engine = MarketBasketEngine::new(MiningParams::new().with_min_support(0.9))
            .with_cache(Arc::clone(&cache));

        assert!(engine.mine_rules(&grocery_records()).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn metric_switch_changes_which_rules_survive() {
        let lift = MarketBasketEngine::new(MiningParams::new().with_min_support(0.3))
            .mine_rules(&grocery_records())
            .expect("lift rules");
        let confidence = MarketBasketEngine::new(
            MiningParams::new()
                .with_min_support(0.3)
                .with_metric(RuleMetric::Confidence)
                .with_min_threshold(0.0),
        )
        .mine_rules(&grocery_records())
        .expect("confidence rules");

        assert!(confidence.len() >= lift.len());
    }
}
