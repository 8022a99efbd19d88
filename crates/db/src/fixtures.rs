use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const DEMO_PREFIX_PATTERN: &str = "demo-%";

/// Expected shape of every demo invoice: `(invoice_id, items)`.
const DEMO_INVOICES: &[(&str, &[&str])] = &[
    ("demo-1001", &["Milk", "Bread", "Butter"]),
    ("demo-1002", &["Milk", "Bread"]),
    ("demo-1003", &["Milk", "Bread", "Butter", "Jam"]),
    ("demo-1004", &["Eggs", "Tea"]),
    ("demo-1005", &["Eggs", "Tea", "Sugar"]),
    ("demo-1006", &["Milk", "Butter"]),
    ("demo-1007", &["Coffee", "Sugar", "Milk"]),
    ("demo-1008", &["Coffee", "Sugar"]),
    ("demo-1009", &["Bread", "Jam"]),
    ("demo-1010", &["Eggs", "Tea"]),
];

/// Small grocery dataset with a few strong co-purchase patterns
/// (Milk/Bread/Butter, Eggs/Tea, Coffee/Sugar).
pub struct DemoBasketDataset;

impl DemoBasketDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_baskets.sql");

    /// Loads the demo invoices, replacing any previously seeded copy.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM invoice_itemized WHERE invoice_id LIKE ?1")
            .bind(DEMO_PREFIX_PATTERN)
            .execute(&mut *tx)
            .await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            invoices_seeded: DEMO_INVOICES.len(),
            lines_seeded: DEMO_INVOICES.iter().map(|(_, items)| items.len()).sum(),
        })
    }

    /// Checks every demo invoice is present with exactly its expected items.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(DEMO_INVOICES.len());

        for (invoice_id, expected) in DEMO_INVOICES {
            let mut stored: Vec<String> = sqlx::query_scalar(
                "SELECT item_name FROM invoice_itemized WHERE invoice_id = ?1 ORDER BY id",
            )
            .bind(*invoice_id)
            .fetch_all(pool)
            .await?;
            stored.sort();

            let mut expected: Vec<&str> = expected.to_vec();
            expected.sort_unstable();

            checks.push((*invoice_id, stored == expected));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM invoice_itemized WHERE invoice_id LIKE ?1")
            .bind(DEMO_PREFIX_PATTERN)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub invoices_seeded: usize,
    pub lines_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
