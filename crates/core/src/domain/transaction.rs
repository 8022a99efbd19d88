use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque transaction identifier (an invoice number in the itemized-invoice table).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for TransactionId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTransactionId {
    Text(String),
    Number(i64),
}

// Exports from point-of-sale systems carry invoice numbers as either strings or integers.
impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawTransactionId::deserialize(deserializer)? {
            RawTransactionId::Text(value) => Self(value),
            RawTransactionId::Number(value) => Self(value.to_string()),
        })
    }
}

/// One `(transaction, item)` pair as supplied by the storage collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: TransactionId,
    pub item_name: String,
}

impl TransactionRecord {
    pub fn new(transaction_id: impl Into<TransactionId>, item_name: impl Into<String>) -> Self {
        Self { transaction_id: transaction_id.into(), item_name: item_name.into() }
    }
}
