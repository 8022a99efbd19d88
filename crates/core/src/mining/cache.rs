//! Rule set cache keyed by data snapshot and parameters

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::domain::rule::RuleMetric;
use crate::domain::transaction::TransactionRecord;

use super::rules::RuleSet;
use super::types::MiningParams;

/// Content hash of a transaction snapshot.
///
/// Two snapshots with the same records in the same order share a version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotVersion([u8; 32]);

impl SnapshotVersion {
    pub fn of(records: &[TransactionRecord]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(records.len() as u64).to_le_bytes());
        for record in records {
            // Length prefixes keep ("ab", "c") distinct from ("a", "bc").
            let id = record.transaction_id.0.as_bytes();
            hasher.update(&(id.len() as u64).to_le_bytes());
            hasher.update(id);
            let item = record.item_name.as_bytes();
            hasher.update(&(item.len() as u64).to_le_bytes());
            hasher.update(item);
        }
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    version: SnapshotVersion,
    min_support_bits: u64,
    metric: RuleMetric,
    min_threshold_bits: u64,
    max_itemset_len: Option<usize>,
}

impl CacheKey {
    pub fn new(version: SnapshotVersion, params: &MiningParams) -> Self {
        Self {
            version,
            min_support_bits: params.min_support.to_bits(),
            metric: params.metric,
            min_threshold_bits: params.min_threshold.to_bits(),
            max_itemset_len: params.limits.max_itemset_len,
        }
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }
}

/// Bounded in-process cache of mined rule sets.
///
/// Only successful runs are stored. When the cache is full it is cleared
/// before the next insert.
#[derive(Debug)]
pub struct RuleCache {
    capacity: usize,
    entries: RwLock<HashMap<CacheKey, Arc<RuleSet>>>,
}

impl RuleCache {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: RwLock::new(HashMap::new()) }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<RuleSet>> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            Err(_) => {
                warn!(event_name = "mining.cache.poisoned", "rule cache lock poisoned; treating as miss");
                None
            }
        }
    }

    pub fn insert(&self, key: CacheKey, rules: Arc<RuleSet>) {
        let Ok(mut entries) = self.entries.write() else {
            warn!(event_name = "mining.cache.poisoned", "rule cache lock poisoned; skipping insert");
            return;
        };

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            entries.clear();
        }
        entries.insert(key, rules);
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Default for RuleCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
