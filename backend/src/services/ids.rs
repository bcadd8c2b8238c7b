//! Generate-and-verify-unique identifier primitive
//!
//! Human-readable prefixed random codes (`PINV-XXXXXXXX` and friends)
//! are generated in memory and checked against the owning table before
//! use. Retries are bounded; running out is reported as an integrity
//! failure rather than looping forever.

use sqlx::{Postgres, Transaction};

use shared::generate_code;

use crate::error::{AppError, AppResult};

const MAX_ATTEMPTS: u32 = 10;

/// Tables that carry generated string primary keys.
#[derive(Debug, Clone, Copy)]
pub enum CodeTable {
    Items,
    StockLedger,
    PurchaseInvoices,
    Payments,
    PaymentAccounts,
    Recipes,
    ProductionBatches,
}

impl CodeTable {
    fn exists_query(&self) -> &'static str {
        match self {
            CodeTable::Items => "SELECT EXISTS(SELECT 1 FROM items WHERE id = $1)",
            CodeTable::StockLedger => "SELECT EXISTS(SELECT 1 FROM stock_ledger WHERE id = $1)",
            CodeTable::PurchaseInvoices => {
                "SELECT EXISTS(SELECT 1 FROM purchase_invoices WHERE id = $1)"
            }
            CodeTable::Payments => "SELECT EXISTS(SELECT 1 FROM payments WHERE id = $1)",
            CodeTable::PaymentAccounts => {
                "SELECT EXISTS(SELECT 1 FROM payment_accounts WHERE id = $1)"
            }
            CodeTable::Recipes => "SELECT EXISTS(SELECT 1 FROM recipes WHERE id = $1)",
            CodeTable::ProductionBatches => {
                "SELECT EXISTS(SELECT 1 FROM production_batches WHERE id = $1)"
            }
        }
    }
}

/// Generate a code with the given prefix and suffix length, retrying
/// until it does not collide with an existing row.
pub async fn unique_code(
    tx: &mut Transaction<'_, Postgres>,
    table: CodeTable,
    prefix: &str,
    length: usize,
) -> AppResult<String> {
    for _ in 0..MAX_ATTEMPTS {
        let code = generate_code(prefix, length);
        let exists: bool = sqlx::query_scalar(table.exists_query())
            .bind(&code)
            .fetch_one(&mut **tx)
            .await?;
        if !exists {
            return Ok(code);
        }
    }
    Err(AppError::Internal(format!(
        "Could not generate a unique {}-prefixed code after {} attempts",
        prefix, MAX_ATTEMPTS
    )))
}
