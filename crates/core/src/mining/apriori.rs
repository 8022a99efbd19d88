//! Level-wise (Apriori) frequent itemset search

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use crate::domain::itemset::FrequentItemset;
use crate::errors::DomainError;

use super::matrix::BasketMatrix;
use super::types::MiningLimits;
use super::MiningResult;

/// Canonical itemset key: item positions sorted ascending, no duplicates.
pub type ItemsetKey = Vec<usize>;

/// An itemset together with its support.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItemset {
    pub items: ItemsetKey,
    pub support: f64,
}

/// Arena of every frequent itemset found, grouped by level.
///
/// `levels[k - 1]` holds the frequent k-itemsets in lexicographic key order;
/// `index` maps each canonical key to its support.
#[derive(Debug, Clone, Default)]
pub struct FrequentItemsets {
    levels: Vec<Vec<ScoredItemset>>,
    index: HashMap<ItemsetKey, f64>,
}

impl FrequentItemsets {
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Size of the largest frequent itemset.
    pub fn max_len(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, size: usize) -> &[ScoredItemset] {
        size.checked_sub(1)
            .and_then(|index| self.levels.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn support_of(&self, itemset: &[usize]) -> Option<f64> {
        self.index.get(itemset).copied()
    }

    pub fn contains(&self, itemset: &[usize]) -> bool {
        self.index.contains_key(itemset)
    }

    /// All itemsets, smallest level first.
    pub fn iter(&self) -> impl Iterator<Item = &ScoredItemset> {
        self.levels.iter().flatten()
    }

    pub fn to_named(&self, matrix: &BasketMatrix) -> Vec<FrequentItemset> {
        self.iter()
            .map(|itemset| FrequentItemset {
                items: matrix.names(&itemset.items),
                support: itemset.support,
            })
            .collect()
    }

    fn push_level(&mut self, level: Vec<ScoredItemset>) {
        for itemset in &level {
            self.index.insert(itemset.items.clone(), itemset.support);
        }
        self.levels.push(level);
    }
}

/// Apriori frequent itemset miner.
///
/// # Algorithm
///
/// 1. Frequent 1-itemsets: items with support >= `min_support`
/// 2. Level k+1 candidates: join frequent k-itemsets sharing their first k-1
///    items, then drop any candidate with an infrequent k-subset
/// 3. Count candidate support against the basket matrix and keep the frequent ones
/// 4. Repeat until a level is empty, the item universe is exhausted, or
///    `max_itemset_len` is reached
///
/// The deadline and candidate cap are checked between levels; exceeding either
/// aborts the run instead of returning a partial result.
#[derive(Debug, Clone)]
pub struct FrequentItemsetMiner {
    min_support: f64,
    limits: MiningLimits,
}

impl FrequentItemsetMiner {
    pub fn new(min_support: f64) -> Self {
        Self { min_support, limits: MiningLimits::default() }
    }

    pub fn with_limits(mut self, limits: MiningLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn mine(&self, matrix: &BasketMatrix) -> MiningResult<FrequentItemsets> {
        // A budget past the clock's range means no deadline.
        let deadline =
            self.limits.time_budget.and_then(|budget| Instant::now().checked_add(budget));
        let mut frequent = FrequentItemsets::default();
        let mut current = self.frequent_singletons(matrix);
        let mut size = 1;

        while !current.is_empty() {
            debug!(
                event_name = "mining.level.completed",
                level = size,
                frequent = current.len(),
                "frequent itemset level completed"
            );
            frequent.push_level(current);

            let reached_cap = self.limits.max_itemset_len.is_some_and(|max| size >= max);
            if reached_cap || size >= matrix.item_count() {
                break;
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(DomainError::DeadlineExceeded { level: size + 1 });
            }

            let candidates = self.generate_candidates(&frequent, size)?;
            if candidates.is_empty() {
                break;
            }

            size += 1;
            current = self.count_support(matrix, candidates);
        }

        Ok(frequent)
    }

    fn frequent_singletons(&self, matrix: &BasketMatrix) -> Vec<ScoredItemset> {
        (0..matrix.item_count())
            .map(|position| ScoredItemset { items: vec![position], support: matrix.support(&[position]) })
            .filter(|itemset| itemset.support >= self.min_support)
            .collect()
    }

    /// Joins frequent `size`-itemsets into `size + 1` candidates and prunes any
    /// candidate with an infrequent subset.
    fn generate_candidates(
        &self,
        frequent: &FrequentItemsets,
        size: usize,
    ) -> MiningResult<Vec<ItemsetKey>> {
        let previous = frequent.level(size);
        let prefix_len = size - 1;
        let mut candidates = Vec::new();

        for (i, left) in previous.iter().enumerate() {
            for right in &previous[i + 1..] {
                // Keys are sorted, so itemsets sharing a prefix are contiguous.
                if left.items[..prefix_len] != right.items[..prefix_len] {
                    break;
                }

                let mut candidate = left.items.clone();
                candidate.push(right.items[prefix_len]);

                if has_infrequent_subset(&candidate, frequent) {
                    continue;
                }

                if let Some(limit) = self.limits.max_candidates {
                    if candidates.len() >= limit {
                        return Err(DomainError::CandidateLimitExceeded { level: size + 1, limit });
                    }
                }
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }

    fn count_support(&self, matrix: &BasketMatrix, candidates: Vec<ItemsetKey>) -> Vec<ScoredItemset> {
        candidates
            .into_iter()
            .map(|items| {
                let support = matrix.support(&items);
                ScoredItemset { items, support }
            })
            .filter(|itemset| itemset.support >= self.min_support)
            .collect()
    }
}

/// True when dropping any single item from `candidate` yields an itemset that
/// was not frequent at the previous level.
fn has_infrequent_subset(candidate: &[usize], frequent: &FrequentItemsets) -> bool {
    let mut subset = Vec::with_capacity(candidate.len().saturating_sub(1));
    (0..candidate.len()).any(|skip| {
        subset.clear();
        subset.extend(
            candidate.iter().enumerate().filter(|(position, _)| *position != skip).map(|(_, item)| *item),
        );
        !frequent.contains(&subset)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::domain::transaction::TransactionRecord;

    fn matrix(baskets: &[(&str, &[&str])]) -> BasketMatrix {
        let records: Vec<TransactionRecord> = baskets
            .iter()
            .flat_map(|(txn, items)| items.iter().map(move |item| TransactionRecord::new(*txn, *item)))
            .collect();
        BasketMatrix::build(&records).expect("matrix should build")
    }

    fn example_matrix() -> BasketMatrix {
        matrix(&[("T1", &["A", "B"]), ("T2", &["A", "B"]), ("T3", &["A", "C"]), ("T4", &["B", "C"])])
    }

    fn named(itemsets: &FrequentItemsets, matrix: &BasketMatrix) -> Vec<(Vec<String>, f64)> {
        itemsets.to_named(matrix).into_iter().map(|itemset| (itemset.items, itemset.support)).collect()
    }

    fn random_matrix(seed: u64) -> BasketMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let catalog = ["Milk", "Bread", "Eggs", "Butter", "Jam", "Tea", "Coffee", "Sugar"];
        let mut records = Vec::new();
        for txn in 0..60_i64 {
            for item in catalog {
                if rng.gen_bool(0.35) {
                    records.push(TransactionRecord::new(txn, item));
                }
            }
            records.push(TransactionRecord::new(txn, catalog[rng.gen_range(0..catalog.len())]));
        }
        BasketMatrix::build(&records).expect("matrix should build")
    }

    #[test]
    fn level_one_and_two_match_worked_example() {
        let matrix = example_matrix();
        let itemsets = FrequentItemsetMiner::new(0.5).mine(&matrix).expect("mining should succeed");

        assert_eq!(
            named(&itemsets, &matrix),
            vec![
                (vec!["A".to_string()], 0.75),
                (vec!["B".to_string()], 0.75),
                (vec!["C".to_string()], 0.5),
                (vec!["A".to_string(), "B".to_string()], 0.5),
            ]
        );
        assert_eq!(itemsets.max_len(), 2);
    }

    #[test]
    fn infrequent_pairs_are_dropped_at_level_two() {
        let matrix = example_matrix();
        let itemsets = FrequentItemsetMiner::new(0.5).mine(&matrix).expect("mining should succeed");

        let a = matrix.item_position("A").expect("A");
        let b = matrix.item_position("B").expect("B");
        let c = matrix.item_position("C").expect("C");
        assert_eq!(itemsets.support_of(&[a, b]), Some(0.5));
        assert_eq!(itemsets.support_of(&[a, c]), None);
        assert_eq!(itemsets.support_of(&[b, c]), None);
    }

    #[test]
    fn empty_level_one_returns_empty_result() {
        let matrix = example_matrix();
        let itemsets = FrequentItemsetMiner::new(1.0).mine(&matrix).expect("mining should succeed");

        assert!(itemsets.is_empty());
        assert_eq!(itemsets.max_len(), 0);
        assert!(itemsets.level(1).is_empty());
    }

    #[test]
    fn candidate_with_infrequent_subset_is_never_counted() {
        // {A,B}, {A,C} frequent but {B,C} is not, so {A,B,C} must be pruned
        // before support counting even though it would otherwise be joined.
        let matrix = matrix(&[
            ("T1", &["A", "B"]),
            ("T2", &["A", "B"]),
            ("T3", &["A", "C"]),
            ("T4", &["A", "C"]),
            ("T5", &["B"]),
            ("T6", &["C"]),
        ]);
        let miner = FrequentItemsetMiner::new(0.3);
        let itemsets = miner.mine(&matrix).expect("mining should succeed");

        let a = matrix.item_position("A").expect("A");
        let b = matrix.item_position("B").expect("B");
        let c = matrix.item_position("C").expect("C");
        assert!(itemsets.contains(&[a, b]));
        assert!(itemsets.contains(&[a, c]));
        assert!(!itemsets.contains(&[b, c]));

        let candidates = miner.generate_candidates(&itemsets, 2).expect("generation should succeed");
        assert!(candidates.is_empty(), "prune should remove {{A,B,C}}: {candidates:?}");
    }

    #[test]
    fn three_item_sets_are_found_when_all_subsets_are_frequent() {
        let matrix = matrix(&[
            ("T1", &["A", "B", "C"]),
            ("T2", &["A", "B", "C"]),
            ("T3", &["A", "B"]),
            ("T4", &["C"]),
        ]);
        let itemsets = FrequentItemsetMiner::new(0.5).mine(&matrix).expect("mining should succeed");

        let abc: Vec<usize> =
            ["A", "B", "C"].iter().filter_map(|item| matrix.item_position(item)).collect();
        assert_eq!(itemsets.support_of(&abc), Some(0.5));
        assert_eq!(itemsets.max_len(), 3);
    }

    #[test]
    fn max_itemset_len_caps_the_search() {
        let matrix = matrix(&[("T1", &["A", "B", "C"]), ("T2", &["A", "B", "C"])]);
        let itemsets = FrequentItemsetMiner::new(0.5)
            .with_limits(MiningLimits::unbounded().with_max_itemset_len(2))
            .mine(&matrix)
            .expect("mining should succeed");

        assert_eq!(itemsets.max_len(), 2);
        assert_eq!(itemsets.len(), 6);
    }

    #[test]
    fn candidate_cap_aborts_the_run() {
        let matrix = matrix(&[("T1", &["A", "B", "C", "D"]), ("T2", &["A", "B", "C", "D"])]);
        let result = FrequentItemsetMiner::new(0.5)
            .with_limits(MiningLimits::unbounded().with_max_candidates(3))
            .mine(&matrix);

        assert_eq!(result.err(), Some(DomainError::CandidateLimitExceeded { level: 2, limit: 3 }));
    }

    #[test]
    fn exhausted_deadline_aborts_between_levels() {
        let matrix = example_matrix();
        let result = FrequentItemsetMiner::new(0.5)
            .with_limits(MiningLimits::unbounded().with_time_budget(Duration::ZERO))
            .mine(&matrix);

        assert_eq!(result.err(), Some(DomainError::DeadlineExceeded { level: 2 }));
    }

    #[test]
    fn oversized_time_budget_means_no_deadline() {
        let matrix = example_matrix();
        let bounded = FrequentItemsetMiner::new(0.5)
            .with_limits(MiningLimits::unbounded().with_time_budget(Duration::MAX))
            .mine(&matrix)
            .expect("an unrepresentable deadline should not abort mining");
        let unbounded = FrequentItemsetMiner::new(0.5)
            .with_limits(MiningLimits::unbounded())
            .mine(&matrix)
            .expect("unbounded mining");

        assert_eq!(bounded.len(), unbounded.len());
        assert_eq!(bounded.max_len(), unbounded.max_len());
    }

    #[test]
    fn every_returned_itemset_meets_support_and_has_frequent_subsets() {
        for seed in 0..8 {
            let matrix = random_matrix(seed);
            for min_support in [0.05, 0.15, 0.3] {
                let itemsets =
                    FrequentItemsetMiner::new(min_support).mine(&matrix).expect("mining should succeed");

                for itemset in itemsets.iter() {
                    assert!(itemset.support >= min_support);
                    assert!((itemset.support - matrix.support(&itemset.items)).abs() < 1e-12);
                    assert!(!has_infrequent_subset(&itemset.items, &itemsets) || itemset.items.len() == 1);
                }
            }
        }
    }

    #[test]
    fn search_is_complete_against_brute_force_on_small_universe() {
        let matrix = random_matrix(42);
        let min_support = 0.1;
        let itemsets = FrequentItemsetMiner::new(min_support).mine(&matrix).expect("mining should succeed");

        let universe = matrix.item_count();
        let mut expected = BTreeSet::new();
        for mask in 1_u32..(1 << universe) {
            let key: Vec<usize> = (0..universe).filter(|bit| mask & (1 << bit) != 0).collect();
            if matrix.support(&key) >= min_support {
                expected.insert(key);
            }
        }

        let found: BTreeSet<Vec<usize>> = itemsets.iter().map(|itemset| itemset.items.clone()).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn mining_twice_yields_the_same_itemsets() {
        let matrix = random_matrix(7);
        let miner = FrequentItemsetMiner::new(0.1);

        let collect = |itemsets: FrequentItemsets| -> HashSet<(Vec<usize>, u64)> {
            itemsets.iter().map(|itemset| (itemset.items.clone(), itemset.support.to_bits())).collect()
        };

        let first = collect(miner.mine(&matrix).expect("first run"));
        let second = collect(miner.mine(&matrix).expect("second run"));
        assert_eq!(first, second);
    }
}
