use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use basket_core::domain::transaction::{TransactionId, TransactionRecord};

pub mod memory;
pub mod transaction;

pub use memory::InMemoryTransactionRepository;
pub use transaction::SqlTransactionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid invoice line: {0}")]
    InvalidLine(String),
}

/// One stored row of an itemized invoice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: i64,
    pub invoice_id: TransactionId,
    pub item_name: String,
    pub quantity: i64,
    pub price: f64,
}

impl InvoiceLine {
    pub fn to_record(&self) -> TransactionRecord {
        TransactionRecord::new(self.invoice_id.clone(), self.item_name.clone())
    }
}

/// Invoice line before it has been assigned a row id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewInvoiceLine {
    pub invoice_id: TransactionId,
    pub item_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub price: f64,
}

fn default_quantity() -> i64 {
    1
}

impl NewInvoiceLine {
    pub fn new(invoice_id: impl Into<TransactionId>, item_name: impl Into<String>) -> Self {
        Self { invoice_id: invoice_id.into(), item_name: item_name.into(), quantity: 1, price: 0.0 }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn validate(&self) -> Result<(), RepositoryError> {
        if self.invoice_id.0.trim().is_empty() {
            return Err(RepositoryError::InvalidLine("invoice_id must not be empty".to_string()));
        }
        if self.item_name.trim().is_empty() {
            return Err(RepositoryError::InvalidLine("item_name must not be empty".to_string()));
        }
        if self.quantity <= 0 {
            return Err(RepositoryError::InvalidLine(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(RepositoryError::InvalidLine(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

/// Source of the `(transaction, item)` pairs the miner reads.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Every `(invoice, item)` pair, ordered by invoice then line id.
    async fn list_records(&self) -> Result<Vec<TransactionRecord>, RepositoryError>;

    /// Full itemized rows in id order.
    async fn list_lines(&self) -> Result<Vec<InvoiceLine>, RepositoryError>;

    async fn append_line(&self, line: NewInvoiceLine) -> Result<InvoiceLine, RepositoryError>;

    async fn count_lines(&self) -> Result<u64, RepositoryError>;
}
