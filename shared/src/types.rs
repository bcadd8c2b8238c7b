//! Common enum types used across the platform
//!
//! All statuses and stages are closed tagged-variant types; transitions
//! go through explicit functions instead of ad-hoc string comparisons.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of a stocked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    RawMaterial,
    FinalProduct,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::RawMaterial => "RAW_MATERIAL",
            ItemKind::FinalProduct => "FINAL_PRODUCT",
        }
    }
}

/// Unit of measure for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitType {
    Pcs,
    Set,
}

/// What caused a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum StockRefType {
    Purchase,
    Sale,
    Production,
    Adjustment,
}

impl StockRefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockRefType::Purchase => "PURCHASE",
            StockRefType::Sale => "SALE",
            StockRefType::Production => "PRODUCTION",
            StockRefType::Adjustment => "ADJUSTMENT",
        }
    }
}

/// What caused a financial ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerRefType {
    Purchase,
    PurchaseUpdate,
    Payment,
    DirectPayment,
    Expense,
}

impl LedgerRefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerRefType::Purchase => "PURCHASE",
            LedgerRefType::PurchaseUpdate => "PURCHASE_UPDATE",
            LedgerRefType::Payment => "PAYMENT",
            LedgerRefType::DirectPayment => "DIRECT_PAYMENT",
            LedgerRefType::Expense => "EXPENSE",
        }
    }
}

/// Payment status of a purchase invoice, always derived from amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
}

impl InvoiceStatus {
    /// Derive status from invoice amounts. This is the single source of
    /// truth; callers never set the status by hand.
    pub fn derive(total_amount: Decimal, paid_amount: Decimal) -> Self {
        if paid_amount >= total_amount {
            InvoiceStatus::Paid
        } else if paid_amount > Decimal::ZERO {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Unpaid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "UNPAID",
            InvoiceStatus::Partial => "PARTIAL",
            InvoiceStatus::Paid => "PAID",
        }
    }
}

/// Type of an individual payment, derived from the balance it settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Full,
    Partial,
    UnPaid,
}

impl PaymentType {
    /// A payment is FULL when it settles the whole balance it is applied to.
    pub fn derive(amount: Decimal, balance_settled: Decimal) -> Self {
        if amount >= balance_settled {
            PaymentType::Full
        } else if amount > Decimal::ZERO {
            PaymentType::Partial
        } else {
            PaymentType::UnPaid
        }
    }
}

/// Strategy for spreading a direct payment across outstanding invoices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AllocationMethod {
    Fifo,
    Lifo,
    Proportional,
}

impl AllocationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationMethod::Fifo => "FIFO",
            AllocationMethod::Lifo => "LIFO",
            AllocationMethod::Proportional => "PROPORTIONAL",
        }
    }
}

/// Production batch lifecycle: DRAFT -> IN_PROCESS -> DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionStage {
    Draft,
    InProcess,
    Done,
}

impl ProductionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStage::Draft => "DRAFT",
            ProductionStage::InProcess => "IN_PROCESS",
            ProductionStage::Done => "DONE",
        }
    }

    /// The only legal transitions are DRAFT -> IN_PROCESS and
    /// IN_PROCESS -> DONE.
    pub fn can_transition_to(&self, next: ProductionStage) -> bool {
        matches!(
            (self, next),
            (ProductionStage::Draft, ProductionStage::InProcess)
                | (ProductionStage::InProcess, ProductionStage::Done)
        )
    }
}

/// Counterparty role in the users table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Supplier,
    Customer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn invoice_status_derivation() {
        assert_eq!(
            InvoiceStatus::derive(dec("100"), dec("0")),
            InvoiceStatus::Unpaid
        );
        assert_eq!(
            InvoiceStatus::derive(dec("100"), dec("40")),
            InvoiceStatus::Partial
        );
        assert_eq!(
            InvoiceStatus::derive(dec("100"), dec("100")),
            InvoiceStatus::Paid
        );
        assert_eq!(
            InvoiceStatus::derive(dec("100"), dec("120")),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn production_stage_transitions() {
        assert!(ProductionStage::Draft.can_transition_to(ProductionStage::InProcess));
        assert!(ProductionStage::InProcess.can_transition_to(ProductionStage::Done));

        assert!(!ProductionStage::Draft.can_transition_to(ProductionStage::Done));
        assert!(!ProductionStage::Done.can_transition_to(ProductionStage::Draft));
        assert!(!ProductionStage::InProcess.can_transition_to(ProductionStage::Draft));
        assert!(!ProductionStage::Done.can_transition_to(ProductionStage::InProcess));
    }
}
