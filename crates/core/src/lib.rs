pub mod config;
pub mod domain;
pub mod errors;
pub mod mining;

pub use domain::itemset::FrequentItemset;
pub use domain::rule::{AssociationRule, Recommendation, RuleMetric};
pub use domain::transaction::{TransactionId, TransactionRecord};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use mining::{
    MarketBasketEngine, MiningLimits, MiningParams, RecommendationResponse, RuleCache, RuleSet,
    RulesResponse,
};
