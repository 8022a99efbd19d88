use async_trait::async_trait;
use sqlx::Row;

use basket_core::domain::transaction::{TransactionId, TransactionRecord};

use super::{InvoiceLine, NewInvoiceLine, RepositoryError, TransactionRepository};
use crate::DbPool;

pub struct SqlTransactionRepository {
    pool: DbPool,
}

impl SqlTransactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for SqlTransactionRepository {
    async fn list_records(&self) -> Result<Vec<TransactionRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT invoice_id, item_name FROM invoice_itemized ORDER BY invoice_id, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<TransactionRecord, RepositoryError> {
                let invoice_id: String = row.try_get("invoice_id")?;
                let item_name: String = row.try_get("item_name")?;
                Ok(TransactionRecord::new(invoice_id, item_name))
            })
            .collect()
    }

    async fn list_lines(&self) -> Result<Vec<InvoiceLine>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, invoice_id, item_name, quantity, price FROM invoice_itemized ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| decode_line(&row)).collect()
    }

    async fn append_line(&self, line: NewInvoiceLine) -> Result<InvoiceLine, RepositoryError> {
        line.validate()?;

        let result = sqlx::query(
            "INSERT INTO invoice_itemized (invoice_id, item_name, quantity, price) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&line.invoice_id.0)
        .bind(&line.item_name)
        .bind(line.quantity)
        .bind(line.price)
        .execute(&self.pool)
        .await?;

        Ok(InvoiceLine {
            id: result.last_insert_rowid(),
            invoice_id: line.invoice_id,
            item_name: line.item_name,
            quantity: line.quantity,
            price: line.price,
        })
    }

    async fn count_lines(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM invoice_itemized")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(count)
            .map_err(|_| RepositoryError::Decode(format!("negative row count `{count}`")))
    }
}

fn decode_line(row: &sqlx::sqlite::SqliteRow) -> Result<InvoiceLine, RepositoryError> {
    let invoice_id: String = row.try_get("invoice_id")?;
    Ok(InvoiceLine {
        id: row.try_get("id")?,
        invoice_id: TransactionId(invoice_id),
        item_name: row.try_get("item_name")?,
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
    })
}
