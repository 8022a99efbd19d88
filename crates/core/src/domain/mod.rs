pub mod itemset;
pub mod rule;
pub mod transaction;
