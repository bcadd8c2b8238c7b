//! Financial ledger service: append-only debit/credit log per counterparty
//!
//! A purchase debits the supplier ("we owe them"); a payment credits
//! them. Balance = Σdebit − Σcredit. Rows are written by the same
//! transactions that move stock, and are only ever removed as part of
//! deleting the originating invoice or payment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use shared::{round_money, FinancialLedgerEntry, LedgerRefType};

use crate::error::{AppError, AppResult};

/// Financial ledger service
#[derive(Clone)]
pub struct FinancialLedgerService {
    db: PgPool,
}

/// Filters for the ledger listing.
#[derive(Debug, Default, Deserialize)]
pub struct FinancialLedgerFilter {
    pub user_id: Option<i64>,
    pub ref_type: Option<LedgerRefType>,
    /// Substring match against the reference id.
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A page of ledger rows with aggregate totals over the filtered set.
#[derive(Debug, Serialize)]
pub struct FinancialLedgerPage {
    pub entries: Vec<FinancialLedgerEntry>,
    pub total_count: i64,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub limit: i64,
    pub offset: i64,
}

/// Balance report for one counterparty.
#[derive(Debug, Serialize)]
pub struct UserBalance {
    pub user_id: i64,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub balance: Decimal,
}

impl FinancialLedgerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append one debit row for a counterparty.
    pub async fn record_debit(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        ref_type: LedgerRefType,
        ref_id: &str,
        amount: Decimal,
    ) -> AppResult<FinancialLedgerEntry> {
        Self::record(tx, user_id, ref_type, ref_id, amount, Decimal::ZERO).await
    }

    /// Append one credit row for a counterparty.
    pub async fn record_credit(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        ref_type: LedgerRefType,
        ref_id: &str,
        amount: Decimal,
    ) -> AppResult<FinancialLedgerEntry> {
        Self::record(tx, user_id, ref_type, ref_id, Decimal::ZERO, amount).await
    }

    async fn record(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        ref_type: LedgerRefType,
        ref_id: &str,
        debit: Decimal,
        credit: Decimal,
    ) -> AppResult<FinancialLedgerEntry> {
        let entry = sqlx::query_as::<_, FinancialLedgerEntry>(
            r#"
            INSERT INTO financial_ledger (user_id, ref_type, ref_id, debit, credit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, ref_type, ref_id, debit, credit, created_at
            "#,
        )
        .bind(user_id)
        .bind(ref_type)
        .bind(ref_id)
        .bind(round_money(debit))
        .bind(round_money(credit))
        .fetch_one(&mut **tx)
        .await?;

        Ok(entry)
    }

    /// Remove all rows written for one originating reference.
    pub async fn delete_for_reference(
        tx: &mut Transaction<'_, Postgres>,
        ref_type: LedgerRefType,
        ref_id: &str,
    ) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM financial_ledger WHERE ref_type = $1 AND ref_id = $2")
                .bind(ref_type)
                .bind(ref_id)
                .execute(&mut **tx)
                .await?;
        Ok(result.rows_affected())
    }

    /// Σdebit − Σcredit for one counterparty, computed inside the
    /// caller's transaction so the figure is consistent with its locks.
    pub async fn user_balance_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
    ) -> AppResult<Decimal> {
        let balance: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(debit - credit), 0) FROM financial_ledger WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(round_money(balance))
    }

    /// Balance report for one counterparty.
    pub async fn user_balance(&self, user_id: i64) -> AppResult<UserBalance> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("User {}", user_id)));
        }

        let (total_debit, total_credit) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT COALESCE(SUM(debit), 0), COALESCE(SUM(credit), 0)
            FROM financial_ledger
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(UserBalance {
            user_id,
            total_debit: round_money(total_debit),
            total_credit: round_money(total_credit),
            balance: round_money(total_debit - total_credit),
        })
    }

    /// List ledger rows with filters, pagination, and aggregate
    /// debit/credit totals over the filtered set.
    pub async fn list(&self, filter: FinancialLedgerFilter) -> AppResult<FinancialLedgerPage> {
        let limit = filter.limit.unwrap_or(50).clamp(1, 500);
        let offset = filter.offset.unwrap_or(0).max(0);

        let entries = sqlx::query_as::<_, FinancialLedgerEntry>(
            r#"
            SELECT id, user_id, ref_type, ref_id, debit, credit, created_at
            FROM financial_ledger
            WHERE ($1::bigint IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR ref_type = $2)
              AND ($3::text IS NULL OR ref_id ILIKE '%' || $3 || '%')
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.ref_type.map(|t| t.as_str()))
        .bind(&filter.search)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let (total_count, total_debit, total_credit) = sqlx::query_as::<_, (i64, Decimal, Decimal)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(debit), 0), COALESCE(SUM(credit), 0)
            FROM financial_ledger
            WHERE ($1::bigint IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR ref_type = $2)
              AND ($3::text IS NULL OR ref_id ILIKE '%' || $3 || '%')
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.ref_type.map(|t| t.as_str()))
        .bind(&filter.search)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_one(&self.db)
        .await?;

        Ok(FinancialLedgerPage {
            entries,
            total_count,
            total_debit: round_money(total_debit),
            total_credit: round_money(total_credit),
            limit,
            offset,
        })
    }
}
