//! Association rule generation from frequent itemsets

use tracing::debug;

use crate::domain::itemset::FrequentItemset;
use crate::domain::rule::{AssociationRule, RuleMetric};
use crate::errors::DomainError;

use super::apriori::{FrequentItemsets, ItemsetKey};
use super::matrix::BasketMatrix;
use super::{MiningResult, LIFT_SENTINEL};

/// Rule over item positions, before names are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRule {
    pub antecedent: ItemsetKey,
    pub consequent: ItemsetKey,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

/// Everything one mining run produced, resolved to item names.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub rules: Vec<AssociationRule>,
    pub frequent_itemsets: Vec<FrequentItemset>,
    pub transaction_count: usize,
    pub item_count: usize,
}

impl RuleSet {
    pub fn resolve(matrix: &BasketMatrix, itemsets: &FrequentItemsets, rules: Vec<IndexedRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| AssociationRule {
                antecedents: matrix.names(&rule.antecedent),
                consequents: matrix.names(&rule.consequent),
                support: rule.support,
                confidence: rule.confidence,
                lift: rule.lift,
            })
            .collect();

        Self {
            rules,
            frequent_itemsets: itemsets.to_named(matrix),
            transaction_count: matrix.transaction_count(),
            item_count: matrix.item_count(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Derives antecedent → consequent rules and keeps those whose metric clears the threshold.
#[derive(Debug, Clone)]
pub struct RuleGenerator {
    metric: RuleMetric,
    min_threshold: f64,
}

impl RuleGenerator {
    pub fn new(metric: RuleMetric, min_threshold: f64) -> Self {
        Self { metric, min_threshold }
    }

    /// Rules are emitted grouped by source itemset (smallest level first), and
    /// within an itemset by antecedent size, then lexicographically.
    pub fn generate(&self, itemsets: &FrequentItemsets) -> MiningResult<Vec<IndexedRule>> {
        let mut rules = Vec::new();

        for itemset in itemsets.iter().filter(|itemset| itemset.items.len() >= 2) {
            let size = itemset.items.len();

            for antecedent_len in 1..size {
                for positions in combinations(size, antecedent_len) {
                    let antecedent: ItemsetKey =
                        positions.iter().map(|position| itemset.items[*position]).collect();
                    let consequent: ItemsetKey = itemset
                        .items
                        .iter()
                        .enumerate()
                        .filter(|(position, _)| !positions.contains(position))
                        .map(|(_, item)| *item)
                        .collect();

                    let rule = score_rule(itemsets, antecedent, consequent, itemset.support)?;
                    let value = self.metric.value_of(rule.support, rule.confidence, rule.lift);
                    if value >= self.min_threshold {
                        rules.push(rule);
                    }
                }
            }
        }

        debug!(
            event_name = "mining.rules.scored",
            metric = %self.metric,
            min_threshold = self.min_threshold,
            kept = rules.len(),
            "association rules scored"
        );

        Ok(rules)
    }
}

fn score_rule(
    itemsets: &FrequentItemsets,
    antecedent: ItemsetKey,
    consequent: ItemsetKey,
    support: f64,
) -> MiningResult<IndexedRule> {
    // Every subset of a frequent itemset was found at an earlier level.
    let antecedent_support = itemsets.support_of(&antecedent).ok_or_else(|| {
        DomainError::InvariantViolation(format!("antecedent {antecedent:?} missing from itemsets"))
    })?;
    let consequent_support = itemsets.support_of(&consequent).ok_or_else(|| {
        DomainError::InvariantViolation(format!("consequent {consequent:?} missing from itemsets"))
    })?;

    if antecedent_support <= 0.0 {
        return Err(DomainError::InvariantViolation(format!(
            "antecedent {antecedent:?} has zero support"
        )));
    }

    let confidence = support / antecedent_support;
    let lift = clamp_lift(confidence, consequent_support);

    Ok(IndexedRule { antecedent, consequent, support, confidence, lift })
}

/// `confidence / consequent_support`, or [`LIFT_SENTINEL`] when that is not a finite number.
pub(crate) fn clamp_lift(confidence: f64, consequent_support: f64) -> f64 {
    if consequent_support <= 0.0 {
        return LIFT_SENTINEL;
    }

    let lift = confidence / consequent_support;
    if lift.is_finite() {
        lift
    } else {
        LIFT_SENTINEL
    }
}

/// All `k`-element position combinations of `0..n`, in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    if k == 0 || k > n {
        return result;
    }

    let mut current: Vec<usize> = (0..k).collect();
    loop {
        result.push(current.clone());

        // Rightmost position that can still advance.
        let Some(pivot) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            break;
        };
        current[pivot] += 1;
        for i in pivot + 1..k {
            current[i] = current[i - 1] + 1;
        }
    }

    result
}
