//! Payment models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::PaymentType;

/// Account a payment is drawn from (cash, bank, wallet).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentAccount {
    pub id: String,
    pub name: String,
    pub kind: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One settlement against a purchase invoice. Payments created by a
/// bulk supplier payment carry the batch reference that grouped them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: String,
    pub user_id: i64,
    pub purchase_invoice_id: String,
    pub amount: Decimal,
    pub account_id: String,
    pub payment_type: PaymentType,
    pub direct_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
