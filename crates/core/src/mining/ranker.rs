//! Per-item recommendation ranking

use crate::domain::rule::{AssociationRule, Recommendation};

/// Ranks consequents of rules whose antecedent contains a query item.
#[derive(Debug, Clone)]
pub struct RecommendationRanker {
    top_k: usize,
}

impl RecommendationRanker {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    /// One recommendation per consequent item of every matching rule, ordered by
    /// lift descending. Ties keep rule-generation order. The same item may
    /// appear more than once when several rules recommend it.
    pub fn rank(&self, item_id: &str, rules: &[AssociationRule]) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = rules
            .iter()
            .filter(|rule| rule.has_antecedent(item_id))
            .flat_map(|rule| {
                rule.consequents.iter().map(|item| Recommendation {
                    item: item.clone(),
                    confidence: rule.confidence,
                    lift: rule.lift,
                })
            })
            .collect();

        // `sort_by` is stable.
        recommendations.sort_by(|a, b| b.lift.total_cmp(&a.lift));
        recommendations.truncate(self.top_k);
        recommendations
    }
}
