//! Direct supplier payments: one amount spread across outstanding
//! invoices
//!
//! The allocation arithmetic is a pure function shared by the
//! persisting path and the simulation path. FIFO/LIFO walk the ordered
//! invoices applying `min(remaining, balance_due)`; PROPORTIONAL gives
//! each invoice its balance-weighted share, capped at its balance, and
//! sweeps any rounding leftover oldest-first so the allocated total
//! always equals the paid amount.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use shared::{
    generate_code, round_money, validate_positive_amount, AllocationMethod, InvoiceStatus,
    LedgerRefType, PurchaseInvoice, DIRECT_PAYMENT_PREFIX,
};

use crate::error::{AppError, AppResult};
use crate::services::purchase::{ensure_account, settle_invoice};
use crate::services::FinancialLedgerService;

/// Direct payment service
#[derive(Clone)]
pub struct DirectPaymentService {
    db: PgPool,
}

/// Input for paying (or simulating a payment to) a supplier.
#[derive(Debug, Deserialize)]
pub struct PaySupplierInput {
    pub amount: Decimal,
    pub account_id: String,
    pub method: AllocationMethod,
}

/// One invoice's share of a direct payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub invoice_id: String,
    pub amount: Decimal,
}

/// Allocation enriched with the invoice's resulting state.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedAllocation {
    pub invoice_id: String,
    pub payment_id: String,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub status_after: InvoiceStatus,
}

/// Result of a persisted direct payment.
#[derive(Debug, Serialize)]
pub struct DirectPaymentResult {
    pub reference_id: String,
    pub supplier_id: i64,
    pub method: AllocationMethod,
    pub total_paid: Decimal,
    pub allocations: Vec<AppliedAllocation>,
    pub outstanding_after: Decimal,
}

/// Result of a simulated direct payment; nothing is persisted.
#[derive(Debug, Serialize)]
pub struct SimulatedPayment {
    pub supplier_id: i64,
    pub method: AllocationMethod,
    pub amount: Decimal,
    pub allocations: Vec<SimulatedAllocation>,
    pub outstanding_before: Decimal,
    pub outstanding_after: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulatedAllocation {
    pub invoice_id: String,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub status_after: InvoiceStatus,
}

/// One open invoice in the outstanding-balance report.
#[derive(Debug, Serialize)]
pub struct OutstandingInvoice {
    pub invoice_id: String,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_due: Decimal,
    pub payment_status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub days_outstanding: i64,
}

/// Outstanding balance report for one supplier.
#[derive(Debug, Serialize)]
pub struct OutstandingReport {
    pub supplier_id: i64,
    pub invoice_count: i64,
    pub outstanding_balance: Decimal,
    pub invoices: Vec<OutstandingInvoice>,
}

/// Spread `amount` across invoices given as `(id, balance_due)` pairs
/// already ordered per the method (oldest first for FIFO, newest first
/// for LIFO; order is irrelevant to the proportional shares but fixes
/// where its rounding leftover goes).
///
/// Guarantees: Σ allocations == amount (the caller must ensure
/// amount <= Σ balances) and no allocation exceeds its balance.
pub fn allocate(
    amount: Decimal,
    invoices: &[(String, Decimal)],
    method: AllocationMethod,
) -> Vec<Allocation> {
    let mut allocations: Vec<Allocation> = Vec::with_capacity(invoices.len());

    match method {
        AllocationMethod::Fifo | AllocationMethod::Lifo => {
            let mut remaining = amount;
            for (invoice_id, balance_due) in invoices {
                if remaining <= Decimal::ZERO {
                    break;
                }
                let share = remaining.min(*balance_due);
                allocations.push(Allocation {
                    invoice_id: invoice_id.clone(),
                    amount: share,
                });
                remaining -= share;
            }
        }
        AllocationMethod::Proportional => {
            let total_balance: Decimal = invoices.iter().map(|(_, b)| *b).sum();
            if total_balance <= Decimal::ZERO {
                return allocations;
            }

            let mut remaining = amount;
            for (invoice_id, balance_due) in invoices {
                let share = round_money(amount * *balance_due / total_balance)
                    .min(*balance_due)
                    .min(remaining);
                allocations.push(Allocation {
                    invoice_id: invoice_id.clone(),
                    amount: share,
                });
                remaining -= share;
            }

            // Rounding can leave a few cents unallocated; sweep them
            // into invoices that still have headroom, in list order.
            if remaining > Decimal::ZERO {
                for (alloc, (_, balance_due)) in allocations.iter_mut().zip(invoices) {
                    if remaining <= Decimal::ZERO {
                        break;
                    }
                    let headroom = *balance_due - alloc.amount;
                    let extra = remaining.min(headroom);
                    alloc.amount += extra;
                    remaining -= extra;
                }
            }

            allocations.retain(|a| a.amount > Decimal::ZERO);
        }
    }

    allocations
}

impl DirectPaymentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Pay a supplier across their outstanding invoices. One payment
    /// row per touched invoice, one aggregate credit row for the batch.
    pub async fn pay_supplier(
        &self,
        supplier_id: i64,
        input: PaySupplierInput,
    ) -> AppResult<DirectPaymentResult> {
        let amount = round_money(input.amount);
        ensure_positive_amount(amount)?;

        let mut tx = self.db.begin().await?;

        ensure_account(&mut tx, &input.account_id).await?;

        // Lock every open invoice up front so the outstanding total and
        // the per-invoice balances cannot shift underneath the walk.
        let invoices = open_invoices_for_update(&mut tx, supplier_id, input.method).await?;
        let outstanding: Decimal = invoices.iter().map(|i| i.balance_due).sum();

        if invoices.is_empty() {
            return Err(AppError::NotFound(format!(
                "Outstanding invoices for supplier {}",
                supplier_id
            )));
        }
        if amount > outstanding {
            return Err(AppError::InsufficientBalance {
                requested: amount,
                outstanding,
            });
        }

        let reference_id = generate_code(DIRECT_PAYMENT_PREFIX, 8);
        let balances: Vec<(String, Decimal)> = invoices
            .iter()
            .map(|i| (i.id.clone(), i.balance_due))
            .collect();
        let plan = allocate(amount, &balances, input.method);

        let mut applied = Vec::with_capacity(plan.len());
        for allocation in &plan {
            let invoice = invoices
                .iter()
                .find(|i| i.id == allocation.invoice_id)
                .ok_or_else(|| {
                    AppError::Internal("Allocation references an unknown invoice".to_string())
                })?;

            let payment = settle_invoice(
                &mut tx,
                invoice,
                allocation.amount,
                &input.account_id,
                Some(&reference_id),
            )
            .await?;

            let balance_after = invoice.balance_due - allocation.amount;
            applied.push(AppliedAllocation {
                invoice_id: invoice.id.clone(),
                payment_id: payment.id,
                amount: allocation.amount,
                balance_before: invoice.balance_due,
                balance_after,
                status_after: InvoiceStatus::derive(
                    invoice.total_amount,
                    invoice.paid_amount + allocation.amount,
                ),
            });
        }

        FinancialLedgerService::record_credit(
            &mut tx,
            supplier_id,
            LedgerRefType::DirectPayment,
            &reference_id,
            amount,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(supplier_id, %reference_id, %amount,
            method = input.method.as_str(), invoices = applied.len(),
            "Applied direct supplier payment");

        Ok(DirectPaymentResult {
            reference_id,
            supplier_id,
            method: input.method,
            total_paid: amount,
            allocations: applied,
            outstanding_after: round_money(outstanding - amount),
        })
    }

    /// Run the identical allocation arithmetic without persisting
    /// anything.
    pub async fn simulate_payment(
        &self,
        supplier_id: i64,
        input: PaySupplierInput,
    ) -> AppResult<SimulatedPayment> {
        let amount = round_money(input.amount);
        ensure_positive_amount(amount)?;

        let invoices = self.open_invoices(supplier_id, input.method).await?;
        let outstanding: Decimal = invoices.iter().map(|i| i.balance_due).sum();

        if invoices.is_empty() {
            return Err(AppError::NotFound(format!(
                "Outstanding invoices for supplier {}",
                supplier_id
            )));
        }
        if amount > outstanding {
            return Err(AppError::InsufficientBalance {
                requested: amount,
                outstanding,
            });
        }

        let balances: Vec<(String, Decimal)> = invoices
            .iter()
            .map(|i| (i.id.clone(), i.balance_due))
            .collect();
        let plan = allocate(amount, &balances, input.method);

        let allocations = plan
            .iter()
            .map(|allocation| {
                let invoice = invoices
                    .iter()
                    .find(|i| i.id == allocation.invoice_id)
                    .ok_or_else(|| {
                        AppError::Internal("Allocation references an unknown invoice".to_string())
                    })?;
                Ok(SimulatedAllocation {
                    invoice_id: invoice.id.clone(),
                    amount: allocation.amount,
                    balance_before: invoice.balance_due,
                    balance_after: invoice.balance_due - allocation.amount,
                    status_after: InvoiceStatus::derive(
                        invoice.total_amount,
                        invoice.paid_amount + allocation.amount,
                    ),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(SimulatedPayment {
            supplier_id,
            method: input.method,
            amount,
            allocations,
            outstanding_before: round_money(outstanding),
            outstanding_after: round_money(outstanding - amount),
        })
    }

    /// Open invoices and total outstanding balance for one supplier.
    pub async fn outstanding(&self, supplier_id: i64) -> AppResult<OutstandingReport> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(supplier_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Supplier {}", supplier_id)));
        }

        let invoices = self
            .open_invoices(supplier_id, AllocationMethod::Fifo)
            .await?;
        let now = Utc::now();
        let outstanding_balance = round_money(invoices.iter().map(|i| i.balance_due).sum());

        let invoices = invoices
            .into_iter()
            .map(|i| OutstandingInvoice {
                days_outstanding: (now - i.created_at).num_days(),
                invoice_id: i.id,
                total_amount: i.total_amount,
                paid_amount: i.paid_amount,
                balance_due: i.balance_due,
                payment_status: i.payment_status,
                created_at: i.created_at,
            })
            .collect::<Vec<_>>();

        Ok(OutstandingReport {
            supplier_id,
            invoice_count: invoices.len() as i64,
            outstanding_balance,
            invoices,
        })
    }

    async fn open_invoices(
        &self,
        supplier_id: i64,
        method: AllocationMethod,
    ) -> AppResult<Vec<PurchaseInvoice>> {
        let invoices = sqlx::query_as::<_, PurchaseInvoice>(&open_invoices_sql(method, false))
            .bind(supplier_id)
            .fetch_all(&self.db)
            .await?;
        Ok(invoices)
    }
}

fn ensure_positive_amount(amount: Decimal) -> AppResult<()> {
    validate_positive_amount(amount).map_err(|message| AppError::Validation {
        field: "amount".to_string(),
        message: message.to_string(),
    })
}

fn open_invoices_sql(method: AllocationMethod, for_update: bool) -> String {
    let order = match method {
        AllocationMethod::Lifo => "DESC",
        // Proportional shares don't depend on order; oldest-first fixes
        // where the rounding leftover lands.
        AllocationMethod::Fifo | AllocationMethod::Proportional => "ASC",
    };
    format!(
        r#"
        SELECT id, supplier_id, total_amount, paid_amount, balance_due,
               payment_status, created_at, updated_at
        FROM purchase_invoices
        WHERE supplier_id = $1 AND balance_due > 0
        ORDER BY created_at {}, id {}
        {}
        "#,
        order,
        order,
        if for_update { "FOR UPDATE" } else { "" }
    )
}

async fn open_invoices_for_update(
    tx: &mut Transaction<'_, Postgres>,
    supplier_id: i64,
    method: AllocationMethod,
) -> AppResult<Vec<PurchaseInvoice>> {
    let invoices = sqlx::query_as::<_, PurchaseInvoice>(&open_invoices_sql(method, true))
        .bind(supplier_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(invoices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn invoices(balances: &[(&str, &str)]) -> Vec<(String, Decimal)> {
        balances
            .iter()
            .map(|(id, b)| (id.to_string(), dec(b)))
            .collect()
    }

    #[test]
    fn fifo_walks_oldest_first() {
        let plan = allocate(
            dec("350000"),
            &invoices(&[("INV-1", "200000"), ("INV-2", "300000")]),
            AllocationMethod::Fifo,
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].amount, dec("200000"));
        assert_eq!(plan[1].amount, dec("150000"));
    }

    #[test]
    fn lifo_is_fifo_over_the_reversed_list() {
        let plan = allocate(
            dec("350000"),
            &invoices(&[("INV-2", "300000"), ("INV-1", "200000")]),
            AllocationMethod::Lifo,
        );
        assert_eq!(plan[0].invoice_id, "INV-2");
        assert_eq!(plan[0].amount, dec("300000"));
        assert_eq!(plan[1].amount, dec("50000"));
    }

    #[test]
    fn proportional_shares_follow_balances() {
        let plan = allocate(
            dec("300"),
            &invoices(&[("INV-1", "200"), ("INV-2", "400")]),
            AllocationMethod::Proportional,
        );
        assert_eq!(plan[0].amount, dec("100.00"));
        assert_eq!(plan[1].amount, dec("200.00"));
    }

    #[test]
    fn proportional_conserves_the_amount_despite_rounding() {
        let inv = invoices(&[("INV-1", "100"), ("INV-2", "100"), ("INV-3", "100")]);
        let amount = dec("100");
        let plan = allocate(amount, &inv, AllocationMethod::Proportional);
        let total: Decimal = plan.iter().map(|a| a.amount).sum();
        assert_eq!(total, amount);
        for (a, (_, balance)) in plan.iter().zip(&inv) {
            assert!(a.amount <= *balance);
        }
    }

    #[test]
    fn full_amount_settles_everything() {
        let inv = invoices(&[("INV-1", "120.50"), ("INV-2", "79.50")]);
        for method in [
            AllocationMethod::Fifo,
            AllocationMethod::Lifo,
            AllocationMethod::Proportional,
        ] {
            let plan = allocate(dec("200.00"), &inv, method);
            let total: Decimal = plan.iter().map(|a| a.amount).sum();
            assert_eq!(total, dec("200.00"), "{:?}", method);
        }
    }
}
