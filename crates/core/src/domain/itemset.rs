use serde::{Deserialize, Serialize};

/// A frequent itemset resolved to item names, sorted ascending.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequentItemset {
    pub items: Vec<String>,
    pub support: f64,
}

impl FrequentItemset {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|candidate| candidate == item)
    }
}
