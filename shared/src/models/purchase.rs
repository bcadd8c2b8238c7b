//! Purchase invoice models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::InvoiceStatus;

/// One supplier purchase transaction.
/// Invariant: `paid_amount + balance_due == total_amount` and
/// `payment_status` is always derived from the two amounts.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PurchaseInvoice {
    pub id: String,
    pub supplier_id: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_due: Decimal,
    pub payment_status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable line item of a purchase invoice.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PurchaseItem {
    pub id: i64,
    pub invoice_id: String,
    pub item_id: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}
