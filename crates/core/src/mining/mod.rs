//! Market Basket Mining
//!
//! Discovers frequent item co-occurrence patterns across transactions and turns
//! them into association rules and ranked item recommendations.
//!
//! Dataflow: raw `(transaction, item)` pairs → [`BasketMatrix`] →
//! [`FrequentItemsets`] → [`RuleSet`] → full rule listing, or ranked
//! recommendations for one item via [`RecommendationRanker`].

mod apriori;
mod cache;
mod engine;
mod matrix;
mod ranker;
mod rules;
mod types;

pub use apriori::{FrequentItemsetMiner, FrequentItemsets, ItemsetKey, ScoredItemset};
pub use cache::{CacheKey, RuleCache, SnapshotVersion};
pub use engine::MarketBasketEngine;
pub use matrix::BasketMatrix;
pub use ranker::RecommendationRanker;
pub use rules::{IndexedRule, RuleGenerator, RuleSet};
pub use types::*;

use crate::errors::DomainError;

/// Result type for mining operations
pub type MiningResult<T> = Result<T, DomainError>;

/// Default minimum support (fraction of transactions)
pub const DEFAULT_MIN_SUPPORT: f64 = 0.01;

/// Default minimum value of the rule metric
pub const DEFAULT_MIN_THRESHOLD: f64 = 1.0;

/// Default number of recommendations returned per item
pub const DEFAULT_TOP_K: usize = 5;

/// Lift reported when the consequent support is degenerate
pub const LIFT_SENTINEL: f64 = 999.99;

/// Default cap on candidates generated for a single level
pub const DEFAULT_MAX_CANDIDATES: usize = 100_000;
