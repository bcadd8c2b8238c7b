//! Stock ledger service: append-only movement log per item
//!
//! Rows are written inside the transaction of whatever operation caused
//! the movement (purchase, production, adjustment) and are never
//! updated. Reversal deletes the rows and re-drives the costing engine
//! backward from the caller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use shared::{round_money, StockLedgerEntry, StockRefType, STOCK_PREFIX};

use crate::error::{AppError, AppResult};
use crate::services::ids::{self, CodeTable};

/// Stock ledger service
#[derive(Clone)]
pub struct StockLedgerService {
    db: PgPool,
}

/// Filters for the ledger listing. All optional; unset filters match
/// everything.
#[derive(Debug, Default, Deserialize)]
pub struct StockLedgerFilter {
    pub item_id: Option<String>,
    pub ref_type: Option<StockRefType>,
    /// Substring match against the reference id.
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One ledger row joined with the item it moved.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockLedgerRow {
    pub id: String,
    pub item_id: String,
    pub item_name: String,
    pub ref_type: StockRefType,
    pub ref_id: String,
    pub qty_in: i64,
    pub qty_out: i64,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A page of ledger rows with aggregate totals over the filtered set.
#[derive(Debug, Serialize)]
pub struct StockLedgerPage {
    pub entries: Vec<StockLedgerRow>,
    pub total_count: i64,
    pub total_qty_in: i64,
    pub total_qty_out: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Current stock position of one item plus lifetime movement totals.
#[derive(Debug, Serialize)]
pub struct ItemStockSummary {
    pub item_id: String,
    pub item_name: String,
    pub total_quantity: i64,
    pub avg_price: Decimal,
    pub stock_value: Decimal,
    pub lifetime_qty_in: i64,
    pub lifetime_qty_out: i64,
}

impl StockLedgerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append one movement row inside the caller's transaction. Pure
    /// append; the item's aggregate fields are the costing engine's job.
    pub async fn record_movement(
        tx: &mut Transaction<'_, Postgres>,
        item_id: &str,
        ref_type: StockRefType,
        ref_id: &str,
        qty_in: i64,
        qty_out: i64,
        unit_price: Decimal,
    ) -> AppResult<StockLedgerEntry> {
        let id = ids::unique_code(tx, CodeTable::StockLedger, STOCK_PREFIX, 8).await?;

        let entry = sqlx::query_as::<_, StockLedgerEntry>(
            r#"
            INSERT INTO stock_ledger (id, item_id, ref_type, ref_id, qty_in, qty_out, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, item_id, ref_type, ref_id, qty_in, qty_out, unit_price, created_at
            "#,
        )
        .bind(&id)
        .bind(item_id)
        .bind(ref_type)
        .bind(ref_id)
        .bind(qty_in)
        .bind(qty_out)
        .bind(round_money(unit_price))
        .fetch_one(&mut **tx)
        .await?;

        Ok(entry)
    }

    /// Remove all rows written for one originating reference, as part
    /// of a compensating reversal.
    pub async fn delete_for_reference(
        tx: &mut Transaction<'_, Postgres>,
        item_id: Option<&str>,
        ref_type: StockRefType,
        ref_id: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM stock_ledger
            WHERE ($1::text IS NULL OR item_id = $1) AND ref_type = $2 AND ref_id = $3
            "#,
        )
        .bind(item_id)
        .bind(ref_type)
        .bind(ref_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// List ledger rows with filters, pagination, and aggregate
    /// qty_in/qty_out totals over the filtered set.
    pub async fn list(&self, filter: StockLedgerFilter) -> AppResult<StockLedgerPage> {
        let limit = filter.limit.unwrap_or(50).clamp(1, 500);
        let offset = filter.offset.unwrap_or(0).max(0);

        let entries = sqlx::query_as::<_, StockLedgerRow>(
            r#"
            SELECT sl.id, sl.item_id, i.name AS item_name, sl.ref_type, sl.ref_id,
                   sl.qty_in, sl.qty_out, sl.unit_price, sl.created_at
            FROM stock_ledger sl
            JOIN items i ON i.id = sl.item_id
            WHERE ($1::text IS NULL OR sl.item_id = $1)
              AND ($2::text IS NULL OR sl.ref_type = $2)
              AND ($3::text IS NULL OR sl.ref_id ILIKE '%' || $3 || '%')
              AND ($4::timestamptz IS NULL OR sl.created_at >= $4)
              AND ($5::timestamptz IS NULL OR sl.created_at <= $5)
            ORDER BY sl.created_at DESC, sl.id DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(&filter.item_id)
        .bind(filter.ref_type.map(|t| t.as_str()))
        .bind(&filter.search)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let (total_count, total_qty_in, total_qty_out) =
            sqlx::query_as::<_, (i64, i64, i64)>(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(qty_in), 0)::BIGINT,
                       COALESCE(SUM(qty_out), 0)::BIGINT
                FROM stock_ledger
                WHERE ($1::text IS NULL OR item_id = $1)
                  AND ($2::text IS NULL OR ref_type = $2)
                  AND ($3::text IS NULL OR ref_id ILIKE '%' || $3 || '%')
                  AND ($4::timestamptz IS NULL OR created_at >= $4)
                  AND ($5::timestamptz IS NULL OR created_at <= $5)
                "#,
            )
            .bind(&filter.item_id)
            .bind(filter.ref_type.map(|t| t.as_str()))
            .bind(&filter.search)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_one(&self.db)
            .await?;

        Ok(StockLedgerPage {
            entries,
            total_count,
            total_qty_in,
            total_qty_out,
            limit,
            offset,
        })
    }

    /// Current position and lifetime movement totals for one item.
    pub async fn item_summary(&self, item_id: &str) -> AppResult<ItemStockSummary> {
        let row = sqlx::query_as::<_, (String, String, i64, Decimal, i64, i64)>(
            r#"
            SELECT i.id, i.name, i.total_quantity, i.avg_price,
                   COALESCE(SUM(sl.qty_in), 0)::BIGINT,
                   COALESCE(SUM(sl.qty_out), 0)::BIGINT
            FROM items i
            LEFT JOIN stock_ledger sl ON sl.item_id = i.id
            WHERE i.id = $1
            GROUP BY i.id, i.name, i.total_quantity, i.avg_price
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {}", item_id)))?;

        Ok(ItemStockSummary {
            item_id: row.0,
            item_name: row.1,
            total_quantity: row.2,
            avg_price: row.3,
            stock_value: round_money(row.3 * Decimal::from(row.2)),
            lifetime_qty_in: row.4,
            lifetime_qty_out: row.5,
        })
    }
}
