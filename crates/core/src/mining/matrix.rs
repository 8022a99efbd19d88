//! Transaction → item-set membership structure

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::transaction::{TransactionId, TransactionRecord};
use crate::errors::DomainError;

use super::MiningResult;

/// Basket matrix indexed by the sorted item universe.
///
/// Items are interned as positions in [`BasketMatrix::items`]; every row holds
/// the set of item positions seen under one transaction. Duplicate
/// `(transaction, item)` pairs collapse to a single membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasketMatrix {
    items: Vec<String>,
    rows: BTreeMap<TransactionId, BTreeSet<usize>>,
}

impl BasketMatrix {
    pub fn build(records: &[TransactionRecord]) -> MiningResult<Self> {
        if records.is_empty() {
            return Err(DomainError::EmptyInput);
        }

        let items: Vec<String> = records
            .iter()
            .map(|record| record.item_name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_owned)
            .collect();

        let mut rows: BTreeMap<TransactionId, BTreeSet<usize>> = BTreeMap::new();
        for record in records {
            let position = items
                .binary_search_by(|item| item.as_str().cmp(record.item_name.as_str()))
                .map_err(|_| {
                    DomainError::InvariantViolation(format!(
                        "item `{}` missing from item universe",
                        record.item_name
                    ))
                })?;
            rows.entry(record.transaction_id.clone()).or_default().insert(position);
        }

        Ok(Self { items, rows })
    }

    pub fn transaction_count(&self) -> usize {
        self.rows.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sorted item universe.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn item_name(&self, position: usize) -> Option<&str> {
        self.items.get(position).map(String::as_str)
    }

    pub fn item_position(&self, name: &str) -> Option<usize> {
        self.items.binary_search_by(|item| item.as_str().cmp(name)).ok()
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<&BTreeSet<usize>> {
        self.rows.get(id)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&TransactionId, &BTreeSet<usize>)> {
        self.rows.iter()
    }

    /// Number of transactions whose item set is a superset of `itemset`.
    pub fn support_count(&self, itemset: &[usize]) -> usize {
        self.rows.values().filter(|row| itemset.iter().all(|item| row.contains(item))).count()
    }

    /// Fraction of transactions containing `itemset`.
    pub fn support(&self, itemset: &[usize]) -> f64 {
        // `build` rejects empty input, so there is always at least one row.
        self.support_count(itemset) as f64 / self.rows.len() as f64
    }

    /// Resolves item positions back to names, preserving order.
    pub fn names(&self, itemset: &[usize]) -> Vec<String> {
        itemset.iter().filter_map(|position| self.items.get(*position).cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(pairs: &[(&str, &str)]) -> Vec<TransactionRecord> {
        pairs.iter().map(|(txn, item)| TransactionRecord::new(*txn, *item)).collect()
    }

    #[test]
    fn empty_input_is_reported_not_panicked() {
        assert_eq!(BasketMatrix::build(&[]), Err(DomainError::EmptyInput));
    }

    #[test]
    fn builds_sorted_universe_and_memberships() {
        let matrix = BasketMatrix::build(&records(&[
            ("T1", "Milk"),
            ("T1", "Bread"),
            ("T2", "Eggs"),
            ("T2", "Bread"),
        ]))
        .expect("matrix should build");

        assert_eq!(matrix.items(), ["Bread", "Eggs", "Milk"]);
        assert_eq!(matrix.transaction_count(), 2);
        assert_eq!(matrix.item_count(), 3);

        let bread = matrix.item_position("Bread").expect("bread is known");
        let milk = matrix.item_position("Milk").expect("milk is known");
        let t1 = matrix.transaction(&"T1".into()).expect("T1 is known");
        assert!(t1.contains(&bread));
        assert!(t1.contains(&milk));
        assert_eq!(matrix.item_position("Butter"), None);
    }

    #[test]
    fn duplicate_pairs_are_counted_once() {
        let matrix = BasketMatrix::build(&records(&[
            ("T1", "Milk"),
            ("T1", "Milk"),
            ("T1", "Milk"),
            ("T2", "Bread"),
        ]))
        .expect("matrix should build");

        let milk = matrix.item_position("Milk").expect("milk is known");
        assert_eq!(matrix.support_count(&[milk]), 1);
        assert!((matrix.support(&[milk]) - 0.5).abs() < 1e-12);
        assert_eq!(matrix.transaction(&"T1".into()).map(|row| row.len()), Some(1));
    }

    #[test]
    fn support_requires_every_item_of_the_itemset() {
        let matrix = BasketMatrix::build(&records(&[
            ("T1", "A"),
            ("T1", "B"),
            ("T2", "A"),
            ("T3", "B"),
            ("T4", "A"),
            ("T4", "B"),
        ]))
        .expect("matrix should build");

        let a = matrix.item_position("A").expect("A is known");
        let b = matrix.item_position("B").expect("B is known");
        assert_eq!(matrix.support_count(&[a, b]), 2);
        assert!((matrix.support(&[a, b]) - 0.5).abs() < 1e-12);
        assert_eq!(matrix.names(&[a, b]), vec!["A".to_string(), "B".to_string()]);
    }
}
