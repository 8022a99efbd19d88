use tokio::sync::RwLock;

use basket_core::domain::transaction::TransactionRecord;

use super::{InvoiceLine, NewInvoiceLine, RepositoryError, TransactionRepository};

/// Process-local invoice store, used by tests and `--input` runs.
#[derive(Default)]
pub struct InMemoryTransactionRepository {
    lines: RwLock<Vec<InvoiceLine>>,
}

impl InMemoryTransactionRepository {
    pub fn from_records(records: impl IntoIterator<Item = TransactionRecord>) -> Self {
        let lines = records
            .into_iter()
            .zip(1_i64..)
            .map(|(record, id)| InvoiceLine {
                id,
                invoice_id: record.transaction_id,
                item_name: record.item_name,
                quantity: 1,
                price: 0.0,
            })
            .collect();
        Self { lines: RwLock::new(lines) }
    }
}

#[async_trait::async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn list_records(&self) -> Result<Vec<TransactionRecord>, RepositoryError> {
        let lines = self.lines.read().await;
        let mut ordered: Vec<&InvoiceLine> = lines.iter().collect();
        ordered.sort_by(|a, b| a.invoice_id.cmp(&b.invoice_id).then(a.id.cmp(&b.id)));
        Ok(ordered.into_iter().map(InvoiceLine::to_record).collect())
    }

    async fn list_lines(&self) -> Result<Vec<InvoiceLine>, RepositoryError> {
        Ok(self.lines.read().await.clone())
    }

    async fn append_line(&self, line: NewInvoiceLine) -> Result<InvoiceLine, RepositoryError> {
        line.validate()?;

        let mut lines = self.lines.write().await;
        let id = lines.last().map_or(1, |last| last.id + 1);
        let stored = InvoiceLine {
            id,
            invoice_id: line.invoice_id,
            item_name: line.item_name,
            quantity: line.quantity,
            price: line.price,
        };
        lines.push(stored.clone());
        Ok(stored)
    }

    async fn count_lines(&self) -> Result<u64, RepositoryError> {
        Ok(self.lines.read().await.len() as u64)
    }
}
