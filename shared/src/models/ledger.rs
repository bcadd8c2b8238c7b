//! Append-only ledger models: stock movements and financial entries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{LedgerRefType, StockRefType};

/// One immutable stock movement. Exactly one of `qty_in` / `qty_out`
/// is nonzero per row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockLedgerEntry {
    pub id: String,
    pub item_id: String,
    pub ref_type: StockRefType,
    /// Id of the invoice or batch that caused the movement.
    pub ref_id: String,
    pub qty_in: i64,
    pub qty_out: i64,
    /// Unit price at the time of the movement.
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One immutable monetary movement against a counterparty.
/// Balance for a counterparty = sum(debit) - sum(credit).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FinancialLedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub ref_type: LedgerRefType,
    pub ref_id: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub created_at: DateTime<Utc>,
}
