//! Purchase invoice engine
//!
//! Orchestrates invoice create/update/delete and single-invoice
//! payments. Every mutating operation runs in one transaction that
//! drives the costing engine, the stock ledger, and the financial
//! ledger together; nothing commits partially.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use shared::{
    round_money, validate_positive_amount, InvoiceStatus, LedgerRefType, Payment, PaymentAccount,
    PaymentType, PurchaseInvoice, PurchaseItem, StockRefType, UserRole, PAYMENT_PREFIX,
    PURCHASE_INVOICE_PREFIX,
};

use crate::error::{AppError, AppResult};
use crate::services::ids::{self, CodeTable};
use crate::services::{costing, FinancialLedgerService, StockLedgerService};

/// Purchase invoice service
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// One requested invoice line.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseLineInput {
    pub item_id: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// Input for creating a purchase invoice, optionally with an initial
/// payment.
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseInput {
    pub supplier_id: i64,
    pub items: Vec<PurchaseLineInput>,
    pub payment_amount: Option<Decimal>,
    pub payment_account_id: Option<String>,
}

/// Input for replacing an invoice's line items.
#[derive(Debug, Deserialize)]
pub struct UpdatePurchaseInput {
    pub items: Vec<PurchaseLineInput>,
}

/// Input for a single-invoice payment.
#[derive(Debug, Deserialize)]
pub struct AddPaymentInput {
    pub amount: Decimal,
    pub account_id: String,
}

/// Invoice line joined with its item name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurchaseLine {
    pub id: i64,
    pub invoice_id: String,
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Invoice with its lines and payments.
#[derive(Debug, Serialize)]
pub struct PurchaseInvoiceDetail {
    #[serde(flatten)]
    pub invoice: PurchaseInvoice,
    pub items: Vec<PurchaseLine>,
    pub payments: Vec<Payment>,
}

/// Filters for the invoice listing.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceFilter {
    pub supplier_id: Option<i64>,
    pub payment_status: Option<InvoiceStatus>,
    /// Substring match against the invoice id.
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A page of invoices with monetary totals over the filtered set.
#[derive(Debug, Serialize)]
pub struct InvoicePage {
    pub invoices: Vec<PurchaseInvoice>,
    pub total_count: i64,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
    pub limit: i64,
    pub offset: i64,
}

/// Per-supplier purchase totals and invoice counts by status.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SupplierPurchaseSummary {
    pub supplier_id: i64,
    pub supplier_name: String,
    pub invoice_count: i64,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
    pub unpaid_count: i64,
    pub partial_count: i64,
    pub paid_count: i64,
}

impl PurchaseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a purchase invoice: stock in, supplier debited, optional
    /// initial payment applied. All-or-nothing.
    pub async fn create_purchase(
        &self,
        input: CreatePurchaseInput,
    ) -> AppResult<PurchaseInvoiceDetail> {
        let lines = validate_lines(&input.items)?;

        let mut tx = self.db.begin().await?;

        ensure_supplier(&mut tx, input.supplier_id).await?;

        let total_amount = round_money(
            lines
                .iter()
                .map(|l| l.unit_price * Decimal::from(l.quantity))
                .sum(),
        );

        let invoice_id =
            ids::unique_code(&mut tx, CodeTable::PurchaseInvoices, PURCHASE_INVOICE_PREFIX, 8)
                .await?;

        let invoice = sqlx::query_as::<_, PurchaseInvoice>(
            r#"
            INSERT INTO purchase_invoices
                (id, supplier_id, total_amount, paid_amount, balance_due, payment_status)
            VALUES ($1, $2, $3, 0, $3, $4)
            RETURNING id, supplier_id, total_amount, paid_amount, balance_due,
                      payment_status, created_at, updated_at
            "#,
        )
        .bind(&invoice_id)
        .bind(input.supplier_id)
        .bind(total_amount)
        .bind(InvoiceStatus::Unpaid)
        .fetch_one(&mut *tx)
        .await?;

        apply_lines(&mut tx, &invoice_id, &lines).await?;

        FinancialLedgerService::record_debit(
            &mut tx,
            input.supplier_id,
            LedgerRefType::Purchase,
            &invoice_id,
            total_amount,
        )
        .await?;

        // Optional initial payment, same path as a standalone payment.
        if let Some(amount) = input.payment_amount {
            let account_id = input.payment_account_id.as_deref().ok_or_else(|| {
                AppError::Validation {
                    field: "payment_account_id".to_string(),
                    message: "An account is required when an initial payment is given"
                        .to_string(),
                }
            })?;
            ensure_account(&mut tx, account_id).await?;
            let invoice = lock_invoice(&mut tx, &invoice_id).await?;
            let payment = settle_invoice(&mut tx, &invoice, amount, account_id, None).await?;
            FinancialLedgerService::record_credit(
                &mut tx,
                invoice.supplier_id,
                LedgerRefType::Payment,
                &payment.id,
                amount,
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(invoice_id = %invoice.id, supplier_id = invoice.supplier_id,
            %total_amount, "Created purchase invoice");

        self.get_invoice(&invoice.id).await
    }

    /// Replace an invoice's line items. Forbidden once the invoice is
    /// PAID; the new total must cover what has already been paid.
    pub async fn update_purchase(
        &self,
        invoice_id: &str,
        input: UpdatePurchaseInput,
    ) -> AppResult<PurchaseInvoiceDetail> {
        let lines = validate_lines(&input.items)?;

        let mut tx = self.db.begin().await?;

        let invoice = lock_invoice(&mut tx, invoice_id).await?;
        if invoice.payment_status == InvoiceStatus::Paid {
            return Err(AppError::InvalidStateTransition(format!(
                "Invoice {} is fully paid; delete its payments before editing",
                invoice_id
            )));
        }

        let new_total = round_money(
            lines
                .iter()
                .map(|l| l.unit_price * Decimal::from(l.quantity))
                .sum(),
        );
        if new_total < invoice.paid_amount {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: format!(
                    "New total {} is below the amount already paid {}",
                    new_total, invoice.paid_amount
                ),
            });
        }

        reverse_lines(&mut tx, invoice_id).await?;
        apply_lines(&mut tx, invoice_id, &lines).await?;

        // One delta row keeps the supplier balance consistent with the
        // new total without rewriting history.
        let delta = new_total - invoice.total_amount;
        if delta > Decimal::ZERO {
            FinancialLedgerService::record_debit(
                &mut tx,
                invoice.supplier_id,
                LedgerRefType::PurchaseUpdate,
                invoice_id,
                delta,
            )
            .await?;
        } else if delta < Decimal::ZERO {
            FinancialLedgerService::record_credit(
                &mut tx,
                invoice.supplier_id,
                LedgerRefType::PurchaseUpdate,
                invoice_id,
                -delta,
            )
            .await?;
        }

        let new_status = InvoiceStatus::derive(new_total, invoice.paid_amount);
        sqlx::query(
            r#"
            UPDATE purchase_invoices
            SET total_amount = $2, balance_due = $2 - paid_amount,
                payment_status = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(invoice_id)
        .bind(new_total)
        .bind(new_status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%invoice_id, %new_total, "Updated purchase invoice");

        self.get_invoice(invoice_id).await
    }

    /// Delete an invoice: payments first, then stock reversal, then
    /// its ledger rows, then the invoice itself.
    pub async fn delete_purchase(&self, invoice_id: &str) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let invoice = lock_invoice(&mut tx, invoice_id).await?;

        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, user_id, purchase_invoice_id, amount, account_id,
                   payment_type, direct_payment_id, created_at
            FROM payments
            WHERE purchase_invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&mut *tx)
        .await?;

        for payment in &payments {
            remove_payment_ledger_rows(&mut tx, payment).await?;
        }
        sqlx::query("DELETE FROM payments WHERE purchase_invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;

        reverse_lines(&mut tx, invoice_id).await?;

        FinancialLedgerService::delete_for_reference(
            &mut tx,
            LedgerRefType::Purchase,
            invoice_id,
        )
        .await?;
        FinancialLedgerService::delete_for_reference(
            &mut tx,
            LedgerRefType::PurchaseUpdate,
            invoice_id,
        )
        .await?;

        sqlx::query("DELETE FROM purchase_invoices WHERE id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%invoice_id, supplier_id = invoice.supplier_id,
            "Deleted purchase invoice");

        Ok(())
    }

    /// Pay part or all of one invoice. The amount must not exceed the
    /// outstanding balance.
    pub async fn add_payment(
        &self,
        invoice_id: &str,
        input: AddPaymentInput,
    ) -> AppResult<Payment> {
        let mut tx = self.db.begin().await?;

        ensure_account(&mut tx, &input.account_id).await?;
        let invoice = lock_invoice(&mut tx, invoice_id).await?;

        let payment =
            settle_invoice(&mut tx, &invoice, input.amount, &input.account_id, None).await?;
        FinancialLedgerService::record_credit(
            &mut tx,
            invoice.supplier_id,
            LedgerRefType::Payment,
            &payment.id,
            payment.amount,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(%invoice_id, payment_id = %payment.id, amount = %payment.amount,
            "Added payment");

        Ok(payment)
    }

    /// Reverse one payment: restore the invoice balance and back out
    /// its financial-ledger effect.
    pub async fn delete_payment(&self, payment_id: &str) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, user_id, purchase_invoice_id, amount, account_id,
                   payment_type, direct_payment_id, created_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment {}", payment_id)))?;

        let invoice = lock_invoice(&mut tx, &payment.purchase_invoice_id).await?;

        let new_paid = invoice.paid_amount - payment.amount;
        let new_status = InvoiceStatus::derive(invoice.total_amount, new_paid);
        sqlx::query(
            r#"
            UPDATE purchase_invoices
            SET paid_amount = $2, balance_due = total_amount - $2,
                payment_status = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(&invoice.id)
        .bind(new_paid)
        .bind(new_status)
        .execute(&mut *tx)
        .await?;

        remove_payment_ledger_rows(&mut tx, &payment).await?;

        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%payment_id, invoice_id = %invoice.id, amount = %payment.amount,
            "Deleted payment");

        Ok(())
    }

    /// Fetch an invoice with its lines and payments.
    pub async fn get_invoice(&self, invoice_id: &str) -> AppResult<PurchaseInvoiceDetail> {
        let invoice = sqlx::query_as::<_, PurchaseInvoice>(
            r#"
            SELECT id, supplier_id, total_amount, paid_amount, balance_due,
                   payment_status, created_at, updated_at
            FROM purchase_invoices
            WHERE id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Purchase invoice {}", invoice_id)))?;

        let items = sqlx::query_as::<_, PurchaseLine>(
            r#"
            SELECT pi.id, pi.invoice_id, pi.item_id, i.name AS item_name,
                   pi.quantity, pi.unit_price,
                   (pi.unit_price * pi.quantity) AS line_total
            FROM purchase_items pi
            JOIN items i ON i.id = pi.item_id
            WHERE pi.invoice_id = $1
            ORDER BY pi.id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.db)
        .await?;

        let payments = self.invoice_payments(invoice_id).await?;

        Ok(PurchaseInvoiceDetail {
            invoice,
            items,
            payments,
        })
    }

    /// Payments recorded against one invoice, oldest first.
    pub async fn invoice_payments(&self, invoice_id: &str) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, user_id, purchase_invoice_id, amount, account_id,
                   payment_type, direct_payment_id, created_at
            FROM payments
            WHERE purchase_invoice_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.db)
        .await?;
        Ok(payments)
    }

    /// List invoices with filters, pagination, and monetary totals
    /// over the filtered set.
    pub async fn list_invoices(&self, filter: InvoiceFilter) -> AppResult<InvoicePage> {
        let limit = filter.limit.unwrap_or(50).clamp(1, 500);
        let offset = filter.offset.unwrap_or(0).max(0);

        let invoices = sqlx::query_as::<_, PurchaseInvoice>(
            r#"
            SELECT id, supplier_id, total_amount, paid_amount, balance_due,
                   payment_status, created_at, updated_at
            FROM purchase_invoices
            WHERE ($1::bigint IS NULL OR supplier_id = $1)
              AND ($2::text IS NULL OR payment_status = $2)
              AND ($3::text IS NULL OR id ILIKE '%' || $3 || '%')
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.supplier_id)
        .bind(filter.payment_status.map(|s| s.as_str()))
        .bind(&filter.search)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let (total_count, total_amount, total_paid, total_outstanding) =
            sqlx::query_as::<_, (i64, Decimal, Decimal, Decimal)>(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(total_amount), 0),
                       COALESCE(SUM(paid_amount), 0),
                       COALESCE(SUM(balance_due), 0)
                FROM purchase_invoices
                WHERE ($1::bigint IS NULL OR supplier_id = $1)
                  AND ($2::text IS NULL OR payment_status = $2)
                  AND ($3::text IS NULL OR id ILIKE '%' || $3 || '%')
                  AND ($4::timestamptz IS NULL OR created_at >= $4)
                  AND ($5::timestamptz IS NULL OR created_at <= $5)
                "#,
            )
            .bind(filter.supplier_id)
            .bind(filter.payment_status.map(|s| s.as_str()))
            .bind(&filter.search)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_one(&self.db)
            .await?;

        Ok(InvoicePage {
            invoices,
            total_count,
            total_amount: round_money(total_amount),
            total_paid: round_money(total_paid),
            total_outstanding: round_money(total_outstanding),
            limit,
            offset,
        })
    }

    /// Purchase totals and status counts grouped by supplier.
    pub async fn purchase_summary(&self) -> AppResult<Vec<SupplierPurchaseSummary>> {
        let rows = sqlx::query_as::<_, SupplierPurchaseSummary>(
            r#"
            SELECT u.id AS supplier_id, u.name AS supplier_name,
                   COUNT(pi.id) AS invoice_count,
                   COALESCE(SUM(pi.total_amount), 0) AS total_amount,
                   COALESCE(SUM(pi.paid_amount), 0) AS total_paid,
                   COALESCE(SUM(pi.balance_due), 0) AS total_outstanding,
                   COUNT(pi.id) FILTER (WHERE pi.payment_status = 'UNPAID') AS unpaid_count,
                   COUNT(pi.id) FILTER (WHERE pi.payment_status = 'PARTIAL') AS partial_count,
                   COUNT(pi.id) FILTER (WHERE pi.payment_status = 'PAID') AS paid_count
            FROM users u
            JOIN purchase_invoices pi ON pi.supplier_id = u.id
            WHERE u.role = 'supplier'
            GROUP BY u.id, u.name
            ORDER BY total_outstanding DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

/// Check line items before opening a transaction. Returns the lines
/// with unit prices rounded to cents once, so costing and the stored
/// rows see the same figure and reversals cancel exactly.
pub fn validate_lines(lines: &[PurchaseLineInput]) -> AppResult<Vec<PurchaseLineInput>> {
    if lines.is_empty() {
        return Err(AppError::Validation {
            field: "items".to_string(),
            message: "At least one line item is required".to_string(),
        });
    }
    let mut normalized = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: format!("Quantity for item {} must be positive", line.item_id),
            });
        }
        if line.unit_price <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "unit_price".to_string(),
                message: format!("Unit price for item {} must be positive", line.item_id),
            });
        }
        normalized.push(PurchaseLineInput {
            item_id: line.item_id.clone(),
            quantity: line.quantity,
            unit_price: round_money(line.unit_price),
        });
    }
    Ok(normalized)
}

/// Verify the counterparty exists and carries the supplier role.
async fn ensure_supplier(tx: &mut Transaction<'_, Postgres>, supplier_id: i64) -> AppResult<()> {
    let role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
        .bind(supplier_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Supplier {}", supplier_id)))?;

    if role != UserRole::Supplier {
        return Err(AppError::Validation {
            field: "supplier_id".to_string(),
            message: format!("User {} is not a supplier", supplier_id),
        });
    }
    Ok(())
}

pub(crate) async fn ensure_account(
    tx: &mut Transaction<'_, Postgres>,
    account_id: &str,
) -> AppResult<PaymentAccount> {
    sqlx::query_as::<_, PaymentAccount>(
        "SELECT id, name, kind, created_at FROM payment_accounts WHERE id = $1",
    )
    .bind(account_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Payment account {}", account_id)))
}

/// Fetch an invoice under a row lock so concurrent payments against
/// the same balance serialize.
pub(crate) async fn lock_invoice(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: &str,
) -> AppResult<PurchaseInvoice> {
    sqlx::query_as::<_, PurchaseInvoice>(
        r#"
        SELECT id, supplier_id, total_amount, paid_amount, balance_due,
               payment_status, created_at, updated_at
        FROM purchase_invoices
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Purchase invoice {}", invoice_id)))
}

/// Apply a payment to a locked invoice: persist the payment row and
/// move the invoice amounts/status. The financial-ledger credit is the
/// caller's responsibility (single payments write one row per payment,
/// direct payments one aggregate row per batch).
pub(crate) async fn settle_invoice(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &PurchaseInvoice,
    amount: Decimal,
    account_id: &str,
    direct_payment_id: Option<&str>,
) -> AppResult<Payment> {
    let amount = round_money(amount);
    validate_positive_amount(amount).map_err(|message| AppError::Validation {
        field: "amount".to_string(),
        message: message.to_string(),
    })?;
    if amount > invoice.balance_due {
        return Err(AppError::InsufficientBalance {
            requested: amount,
            outstanding: invoice.balance_due,
        });
    }

    let payment_id = ids::unique_code(tx, CodeTable::Payments, PAYMENT_PREFIX, 8).await?;
    let payment_type = PaymentType::derive(amount, invoice.balance_due);

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments
            (id, user_id, purchase_invoice_id, amount, account_id, payment_type,
             direct_payment_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, user_id, purchase_invoice_id, amount, account_id,
                  payment_type, direct_payment_id, created_at
        "#,
    )
    .bind(&payment_id)
    .bind(invoice.supplier_id)
    .bind(&invoice.id)
    .bind(amount)
    .bind(account_id)
    .bind(payment_type)
    .bind(direct_payment_id)
    .fetch_one(&mut **tx)
    .await?;

    let new_paid = invoice.paid_amount + amount;
    let new_status = InvoiceStatus::derive(invoice.total_amount, new_paid);
    sqlx::query(
        r#"
        UPDATE purchase_invoices
        SET paid_amount = $2, balance_due = total_amount - $2,
            payment_status = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(&invoice.id)
    .bind(new_paid)
    .bind(new_status)
    .execute(&mut **tx)
    .await?;

    Ok(payment)
}

/// Back out a payment's financial-ledger effect. Standalone payments
/// own a PAYMENT row that is deleted; members of a direct-payment
/// batch share one aggregate credit, reversed by an offsetting debit.
async fn remove_payment_ledger_rows(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
) -> AppResult<()> {
    match &payment.direct_payment_id {
        None => {
            FinancialLedgerService::delete_for_reference(
                tx,
                LedgerRefType::Payment,
                &payment.id,
            )
            .await?;
        }
        Some(batch_ref) => {
            FinancialLedgerService::record_debit(
                tx,
                payment.user_id,
                LedgerRefType::DirectPayment,
                batch_ref,
                payment.amount,
            )
            .await?;
        }
    }
    Ok(())
}

/// Reverse every line of an invoice: costing rolled back, stock-ledger
/// rows and line rows deleted.
async fn reverse_lines(tx: &mut Transaction<'_, Postgres>, invoice_id: &str) -> AppResult<()> {
    let lines = sqlx::query_as::<_, PurchaseItem>(
        r#"
        SELECT id, invoice_id, item_id, quantity, unit_price
        FROM purchase_items
        WHERE invoice_id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut **tx)
    .await?;

    for line in lines {
        costing::reverse_receipt(tx, &line.item_id, line.quantity, line.unit_price).await?;
    }

    StockLedgerService::delete_for_reference(tx, None, StockRefType::Purchase, invoice_id).await?;
    sqlx::query("DELETE FROM purchase_items WHERE invoice_id = $1")
        .bind(invoice_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Apply new lines: costing forward, one stock-ledger row and one
/// line row per item.
async fn apply_lines(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: &str,
    lines: &[PurchaseLineInput],
) -> AppResult<()> {
    for line in lines {
        costing::receive_stock(tx, &line.item_id, line.quantity, line.unit_price).await?;
        StockLedgerService::record_movement(
            tx,
            &line.item_id,
            StockRefType::Purchase,
            invoice_id,
            line.quantity,
            0,
            line.unit_price,
        )
        .await?;
        sqlx::query(
            r#"
            INSERT INTO purchase_items (invoice_id, item_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(invoice_id)
        .bind(&line.item_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
