//! Production engine: recipe-driven manufacturing batches
//!
//! A batch moves DRAFT -> IN_PROCESS -> DONE. The DRAFT carries a
//! snapshot copy of the master recipe, editable per batch; execution
//! consumes raw materials against that snapshot under row locks, and
//! completion credits the finished product once. Raw materials move
//! exactly once (at execution) and finished stock exactly once (at
//! completion).

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use shared::{
    normalize_serial_list, round_money, round_quantity, validate_positive_quantity,
    ProductionBatch, ProductionBatchRecipeItem, ProductionSerial, ProductionStage, RecipeItem,
    StockRefType, PRODUCTION_BATCH_PREFIX,
};

use crate::error::{AppError, AppResult, StockShortfall};
use crate::services::ids::{self, CodeTable};
use crate::services::items::{ensure_final_product, ensure_raw_material};
use crate::services::{costing, StockLedgerService};

/// Production batch service
#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

/// Input for creating a DRAFT batch.
#[derive(Debug, Deserialize)]
pub struct CreateDraftInput {
    pub final_product_id: String,
    pub quantity: i64,
    pub serials: Vec<String>,
}

/// One snapshot recipe line supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotLineInput {
    pub raw_item_id: String,
    pub quantity_per_unit: Decimal,
}

/// Input for editing a DRAFT batch. Each part is independently
/// optional; changing the quantity requires a matching serial list.
#[derive(Debug, Deserialize)]
pub struct UpdateDraftInput {
    pub quantity: Option<i64>,
    pub serials: Option<Vec<String>>,
    pub recipe_items: Option<Vec<SnapshotLineInput>>,
}

/// Filters for the batch listing.
#[derive(Debug, Default, Deserialize)]
pub struct BatchFilter {
    pub final_product_id: Option<String>,
    pub stage: Option<ProductionStage>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A page of batches.
#[derive(Debug, Serialize)]
pub struct BatchPage {
    pub batches: Vec<BatchRow>,
    pub total_count: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Batch joined with its product name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BatchRow {
    pub id: String,
    pub final_product_id: String,
    pub final_product_name: String,
    pub quantity_produced: i64,
    pub stage: ProductionStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot line joined with the raw item's name and current cost.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SnapshotLine {
    pub id: i64,
    pub raw_item_id: String,
    pub raw_item_name: String,
    pub quantity_per_unit: Decimal,
    pub raw_avg_price: Decimal,
}

/// Full batch report: serials, snapshot with current raw prices, and
/// the cost the snapshot implies at those prices.
#[derive(Debug, Serialize)]
pub struct BatchDetail {
    #[serde(flatten)]
    pub batch: ProductionBatch,
    pub final_product_name: String,
    pub serials: Vec<ProductionSerial>,
    pub recipe_items: Vec<SnapshotLine>,
    pub total_estimated_cost: Decimal,
    pub cost_per_unit: Decimal,
}

/// One raw item's requirement in a preview/feasibility report.
#[derive(Debug, Clone, Serialize)]
pub struct RequirementLine {
    pub raw_item_id: String,
    pub raw_item_name: String,
    pub quantity_per_unit: Decimal,
    pub required_quantity: Decimal,
    pub available_quantity: i64,
    pub sufficient: bool,
}

/// Non-mutating requirements preview for producing `quantity` units.
#[derive(Debug, Serialize)]
pub struct ProductionPreview {
    pub final_product_id: String,
    pub quantity: i64,
    pub items: Vec<RequirementLine>,
    pub total_estimated_cost: Decimal,
}

/// One raw item that falls short of the requested quantity. Carries
/// the exact requirement, not a rounded one, so a fractional shortfall
/// is never reported as zero.
#[derive(Debug, Clone, Serialize)]
pub struct InsufficientLine {
    pub raw_item_id: String,
    pub raw_item_name: String,
    pub required_quantity: Decimal,
    pub available_quantity: i64,
    pub shortfall: Decimal,
}

/// Feasibility report: the preview plus the maximum producible
/// quantity and the items blocking the request.
#[derive(Debug, Serialize)]
pub struct FeasibilityReport {
    pub final_product_id: String,
    pub requested_quantity: i64,
    pub feasible: bool,
    pub max_producible_quantity: i64,
    pub items: Vec<RequirementLine>,
    pub insufficient_items: Vec<InsufficientLine>,
    pub total_estimated_cost: Decimal,
}

impl ProductionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Requirements and estimated cost for producing `quantity` units,
    /// from the master recipe. Nothing is persisted.
    pub async fn preview(
        &self,
        final_product_id: &str,
        quantity: i64,
    ) -> AppResult<ProductionPreview> {
        ensure_positive_quantity(quantity)?;
        let lines = self.master_recipe_lines(final_product_id).await?;
        let (items, total_estimated_cost) = requirement_lines(&lines, quantity);

        Ok(ProductionPreview {
            final_product_id: final_product_id.to_string(),
            quantity,
            items,
            total_estimated_cost,
        })
    }

    /// Preview plus the maximum quantity the current stock supports
    /// and the exact shortfalls blocking the request.
    pub async fn feasibility(
        &self,
        final_product_id: &str,
        quantity: i64,
    ) -> AppResult<FeasibilityReport> {
        ensure_positive_quantity(quantity)?;
        let lines = self.master_recipe_lines(final_product_id).await?;
        let (items, total_estimated_cost) = requirement_lines(&lines, quantity);

        let max_producible_quantity = max_producible(
            &lines
                .iter()
                .map(|l| (l.quantity_per_unit, l.available_quantity))
                .collect::<Vec<_>>(),
        );

        let insufficient_items: Vec<InsufficientLine> = items
            .iter()
            .filter(|l| !l.sufficient)
            .map(|l| InsufficientLine {
                raw_item_id: l.raw_item_id.clone(),
                raw_item_name: l.raw_item_name.clone(),
                required_quantity: l.required_quantity,
                available_quantity: l.available_quantity,
                shortfall: l.required_quantity - Decimal::from(l.available_quantity),
            })
            .collect();

        Ok(FeasibilityReport {
            final_product_id: final_product_id.to_string(),
            requested_quantity: quantity,
            feasible: insufficient_items.is_empty(),
            max_producible_quantity,
            items,
            insufficient_items,
            total_estimated_cost,
        })
    }

    /// Create a DRAFT batch: serials normalized and globally unique,
    /// master recipe copied into a batch-local snapshot. No stock moves.
    pub async fn create_draft(&self, input: CreateDraftInput) -> AppResult<BatchDetail> {
        ensure_positive_quantity(input.quantity)?;
        let serials = normalize_serials(&input.serials, input.quantity)?;

        let mut tx = self.db.begin().await?;

        ensure_final_product(&mut *tx, &input.final_product_id).await?;
        ensure_serials_unused(&mut tx, &serials, None).await?;

        let master = sqlx::query_as::<_, RecipeItem>(
            r#"
            SELECT ri.id, ri.recipe_id, ri.raw_item_id, ri.quantity_per_unit
            FROM recipe_items ri
            JOIN recipes r ON r.id = ri.recipe_id
            WHERE r.final_product_id = $1
            ORDER BY ri.id
            "#,
        )
        .bind(&input.final_product_id)
        .fetch_all(&mut *tx)
        .await?;
        if master.is_empty() {
            return Err(AppError::NotFound(format!(
                "Recipe for product {}",
                input.final_product_id
            )));
        }

        let batch_id =
            ids::unique_code(&mut tx, CodeTable::ProductionBatches, PRODUCTION_BATCH_PREFIX, 5)
                .await?;
        sqlx::query(
            r#"
            INSERT INTO production_batches (id, final_product_id, quantity_produced, stage)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&batch_id)
        .bind(&input.final_product_id)
        .bind(input.quantity)
        .bind(ProductionStage::Draft)
        .execute(&mut *tx)
        .await?;

        insert_serials(&mut tx, &batch_id, &input.final_product_id, &serials).await?;
        for line in &master {
            sqlx::query(
                r#"
                INSERT INTO production_batch_recipe_items
                    (production_batch_id, raw_item_id, quantity_per_unit)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&batch_id)
            .bind(&line.raw_item_id)
            .bind(line.quantity_per_unit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(%batch_id, final_product_id = %input.final_product_id,
            quantity = input.quantity, "Created production draft");

        self.get_batch(&batch_id).await
    }

    /// Edit a DRAFT batch: quantity/serials and/or the snapshot lines.
    pub async fn update_draft(
        &self,
        batch_id: &str,
        input: UpdateDraftInput,
    ) -> AppResult<BatchDetail> {
        let mut tx = self.db.begin().await?;

        let batch = lock_batch(&mut tx, batch_id).await?;
        if batch.stage != ProductionStage::Draft {
            return Err(AppError::InvalidStateTransition(format!(
                "Batch {} is {}; only DRAFT batches can be edited",
                batch_id,
                batch.stage.as_str()
            )));
        }

        if input.quantity.is_some() || input.serials.is_some() {
            let quantity = input.quantity.unwrap_or(batch.quantity_produced);
            ensure_positive_quantity(quantity)?;
            let serials = input.serials.as_ref().ok_or_else(|| AppError::Validation {
                field: "serials".to_string(),
                message: "Serials must be supplied when the quantity changes".to_string(),
            })?;
            let serials = normalize_serials(serials, quantity)?;
            ensure_serials_unused(&mut tx, &serials, Some(batch_id)).await?;

            sqlx::query("DELETE FROM production_serials WHERE production_batch_id = $1")
                .bind(batch_id)
                .execute(&mut *tx)
                .await?;
            insert_serials(&mut tx, batch_id, &batch.final_product_id, &serials).await?;
            sqlx::query(
                r#"
                UPDATE production_batches
                SET quantity_produced = $2, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(batch_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(lines) = &input.recipe_items {
            validate_snapshot_lines(lines)?;
            sqlx::query("DELETE FROM production_batch_recipe_items WHERE production_batch_id = $1")
                .bind(batch_id)
                .execute(&mut *tx)
                .await?;
            for line in lines {
                ensure_raw_material(&mut *tx, &line.raw_item_id).await?;
                sqlx::query(
                    r#"
                    INSERT INTO production_batch_recipe_items
                        (production_batch_id, raw_item_id, quantity_per_unit)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(batch_id)
                .bind(&line.raw_item_id)
                .bind(line.quantity_per_unit)
                .execute(&mut *tx)
                .await?;
            }
            sqlx::query("UPDATE production_batches SET updated_at = NOW() WHERE id = $1")
                .bind(batch_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(%batch_id, "Updated production draft");

        self.get_batch(batch_id).await
    }

    /// DRAFT -> IN_PROCESS: verify every raw item covers its required
    /// total under row locks, then deduct each exactly once. A single
    /// shortfall aborts the whole transition with the full breakdown.
    pub async fn execute_draft(&self, batch_id: &str) -> AppResult<BatchDetail> {
        let mut tx = self.db.begin().await?;

        let batch = lock_batch(&mut tx, batch_id).await?;
        ensure_transition(&batch, ProductionStage::InProcess)?;

        // Snapshot lines, ordered by item id so concurrent executions
        // acquire item locks in the same order.
        let lines = sqlx::query_as::<_, ProductionBatchRecipeItem>(
            r#"
            SELECT id, production_batch_id, raw_item_id, quantity_per_unit
            FROM production_batch_recipe_items
            WHERE production_batch_id = $1
            ORDER BY raw_item_id
            "#,
        )
        .bind(batch_id)
        .fetch_all(&mut *tx)
        .await?;
        if lines.is_empty() {
            return Err(AppError::Validation {
                field: "recipe_items".to_string(),
                message: format!("Batch {} has no recipe snapshot to execute", batch_id),
            });
        }

        // Check-then-deduct under the same locks. The sufficiency
        // comparison uses the exact requirement; only the deducted
        // quantity is rounded to whole units.
        let mut requirements = Vec::with_capacity(lines.len());
        let mut shortfalls = Vec::new();
        for line in &lines {
            let required = line.quantity_per_unit * Decimal::from(batch.quantity_produced);
            let item = costing::lock_item(&mut tx, &line.raw_item_id).await?;
            match stock_shortfall(item.total_quantity, required) {
                Some(missing) => shortfalls.push(StockShortfall {
                    item_id: item.id.clone(),
                    item_name: item.name.clone(),
                    required,
                    available: item.total_quantity,
                    shortfall: missing,
                }),
                None => requirements.push((item, round_quantity(required))),
            }
        }
        if !shortfalls.is_empty() {
            return Err(AppError::InsufficientStock(shortfalls));
        }

        for (item, required) in &requirements {
            costing::consume_stock(&mut tx, &item.id, *required).await?;
            StockLedgerService::record_movement(
                &mut tx,
                &item.id,
                StockRefType::Production,
                batch_id,
                0,
                *required,
                item.avg_price,
            )
            .await?;
        }

        sqlx::query(
            "UPDATE production_batches SET stage = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(batch_id)
        .bind(ProductionStage::InProcess)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%batch_id, quantity = batch.quantity_produced,
            raw_items = requirements.len(), "Executed production draft");

        self.get_batch(batch_id).await
    }

    /// IN_PROCESS -> DONE: credit the finished product once, at its
    /// own current average price (no new cost information arrives
    /// here; the raw cost was consumed at execution).
    pub async fn complete_batch(&self, batch_id: &str) -> AppResult<BatchDetail> {
        let mut tx = self.db.begin().await?;

        let batch = lock_batch(&mut tx, batch_id).await?;
        ensure_transition(&batch, ProductionStage::Done)?;

        let product = costing::lock_item(&mut tx, &batch.final_product_id).await?;
        costing::receive_stock(
            &mut tx,
            &batch.final_product_id,
            batch.quantity_produced,
            product.avg_price,
        )
        .await?;
        StockLedgerService::record_movement(
            &mut tx,
            &batch.final_product_id,
            StockRefType::Production,
            batch_id,
            batch.quantity_produced,
            0,
            product.avg_price,
        )
        .await?;

        sqlx::query(
            "UPDATE production_batches SET stage = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(batch_id)
        .bind(ProductionStage::Done)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%batch_id, final_product_id = %batch.final_product_id,
            quantity = batch.quantity_produced, "Completed production batch");

        self.get_batch(batch_id).await
    }

    /// Delete a DRAFT batch with its serials and snapshot. Batches
    /// past DRAFT already moved inventory and stay.
    pub async fn delete_batch(&self, batch_id: &str) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let batch = lock_batch(&mut tx, batch_id).await?;
        if batch.stage != ProductionStage::Draft {
            return Err(AppError::InvalidStateTransition(format!(
                "Batch {} is {}; only DRAFT batches can be deleted",
                batch_id,
                batch.stage.as_str()
            )));
        }

        sqlx::query("DELETE FROM production_serials WHERE production_batch_id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM production_batch_recipe_items WHERE production_batch_id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM production_batches WHERE id = $1")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%batch_id, "Deleted production draft");

        Ok(())
    }

    /// Full batch report with serials, snapshot, and estimated cost at
    /// current raw prices.
    pub async fn get_batch(&self, batch_id: &str) -> AppResult<BatchDetail> {
        let batch = sqlx::query_as::<_, ProductionBatch>(
            r#"
            SELECT id, final_product_id, quantity_produced, stage, created_at, updated_at
            FROM production_batches
            WHERE id = $1
            "#,
        )
        .bind(batch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Production batch {}", batch_id)))?;

        let final_product_name: String = sqlx::query_scalar("SELECT name FROM items WHERE id = $1")
            .bind(&batch.final_product_id)
            .fetch_one(&self.db)
            .await?;

        let serials = sqlx::query_as::<_, ProductionSerial>(
            r#"
            SELECT id, production_batch_id, serial_number, final_product_id
            FROM production_serials
            WHERE production_batch_id = $1
            ORDER BY id
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?;

        let recipe_items = sqlx::query_as::<_, SnapshotLine>(
            r#"
            SELECT pbri.id, pbri.raw_item_id, i.name AS raw_item_name,
                   pbri.quantity_per_unit, i.avg_price AS raw_avg_price
            FROM production_batch_recipe_items pbri
            JOIN items i ON i.id = pbri.raw_item_id
            WHERE pbri.production_batch_id = $1
            ORDER BY pbri.id
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?;

        let total_estimated_cost = round_money(
            recipe_items
                .iter()
                .map(|l| {
                    l.quantity_per_unit * Decimal::from(batch.quantity_produced) * l.raw_avg_price
                })
                .sum(),
        );
        let cost_per_unit = if batch.quantity_produced > 0 {
            round_money(total_estimated_cost / Decimal::from(batch.quantity_produced))
        } else {
            Decimal::ZERO
        };

        Ok(BatchDetail {
            batch,
            final_product_name,
            serials,
            recipe_items,
            total_estimated_cost,
            cost_per_unit,
        })
    }

    /// List batches with product/stage filters and pagination.
    pub async fn list_batches(&self, filter: BatchFilter) -> AppResult<BatchPage> {
        let limit = filter.limit.unwrap_or(50).clamp(1, 500);
        let offset = filter.offset.unwrap_or(0).max(0);

        let batches = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT pb.id, pb.final_product_id, i.name AS final_product_name,
                   pb.quantity_produced, pb.stage, pb.created_at, pb.updated_at
            FROM production_batches pb
            JOIN items i ON i.id = pb.final_product_id
            WHERE ($1::text IS NULL OR pb.final_product_id = $1)
              AND ($2::text IS NULL OR pb.stage = $2)
            ORDER BY pb.created_at DESC, pb.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.final_product_id)
        .bind(filter.stage.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM production_batches
            WHERE ($1::text IS NULL OR final_product_id = $1)
              AND ($2::text IS NULL OR stage = $2)
            "#,
        )
        .bind(&filter.final_product_id)
        .bind(filter.stage.map(|s| s.as_str()))
        .fetch_one(&self.db)
        .await?;

        Ok(BatchPage {
            batches,
            total_count,
            limit,
            offset,
        })
    }

    /// Master recipe lines joined with the raw items' current position.
    async fn master_recipe_lines(&self, final_product_id: &str) -> AppResult<Vec<MasterLine>> {
        ensure_final_product(&self.db, final_product_id).await?;

        let lines = sqlx::query_as::<_, MasterLine>(
            r#"
            SELECT ri.raw_item_id, i.name AS raw_item_name, ri.quantity_per_unit,
                   i.total_quantity AS available_quantity, i.avg_price
            FROM recipe_items ri
            JOIN recipes r ON r.id = ri.recipe_id
            JOIN items i ON i.id = ri.raw_item_id
            WHERE r.final_product_id = $1
            ORDER BY ri.id
            "#,
        )
        .bind(final_product_id)
        .fetch_all(&self.db)
        .await?;
        if lines.is_empty() {
            return Err(AppError::NotFound(format!(
                "Recipe for product {}",
                final_product_id
            )));
        }
        Ok(lines)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MasterLine {
    raw_item_id: String,
    raw_item_name: String,
    quantity_per_unit: Decimal,
    available_quantity: i64,
    avg_price: Decimal,
}

/// Quantity missing when `available` whole units cannot cover the
/// exact requirement; `None` when they can. A fractional requirement
/// that would round down to the available quantity still counts as
/// short.
pub fn stock_shortfall(available: i64, required: Decimal) -> Option<Decimal> {
    let available = Decimal::from(available);
    if available < required {
        Some(required - available)
    } else {
        None
    }
}

/// Highest quantity the current stock supports: min over raw items of
/// floor(available / quantity_per_unit), over `(quantity_per_unit,
/// available)` pairs.
pub fn max_producible(lines: &[(Decimal, i64)]) -> i64 {
    lines
        .iter()
        .map(|(per_unit, available)| {
            if *per_unit <= Decimal::ZERO {
                return 0;
            }
            (Decimal::from(*available) / per_unit)
                .floor()
                .to_i64()
                .unwrap_or(0)
        })
        .min()
        .unwrap_or(0)
}

fn requirement_lines(lines: &[MasterLine], quantity: i64) -> (Vec<RequirementLine>, Decimal) {
    let mut total_cost = Decimal::ZERO;
    let items = lines
        .iter()
        .map(|l| {
            let required = l.quantity_per_unit * Decimal::from(quantity);
            total_cost += required * l.avg_price;
            RequirementLine {
                raw_item_id: l.raw_item_id.clone(),
                raw_item_name: l.raw_item_name.clone(),
                quantity_per_unit: l.quantity_per_unit,
                required_quantity: required,
                available_quantity: l.available_quantity,
                sufficient: stock_shortfall(l.available_quantity, required).is_none(),
            }
        })
        .collect();
    (items, round_money(total_cost))
}

fn ensure_positive_quantity(quantity: i64) -> AppResult<()> {
    validate_positive_quantity(quantity).map_err(|message| AppError::Validation {
        field: "quantity".to_string(),
        message: message.to_string(),
    })
}

fn ensure_transition(batch: &ProductionBatch, next: ProductionStage) -> AppResult<()> {
    if !batch.stage.can_transition_to(next) {
        return Err(AppError::InvalidStateTransition(format!(
            "Batch {} is {}; cannot move to {}",
            batch.id,
            batch.stage.as_str(),
            next.as_str()
        )));
    }
    Ok(())
}

/// Normalize and validate a serial list against the batch quantity.
fn normalize_serials(serials: &[String], quantity: i64) -> AppResult<Vec<String>> {
    if serials.len() as i64 != quantity {
        return Err(AppError::Validation {
            field: "serials".to_string(),
            message: format!(
                "Expected {} serial numbers, got {}",
                quantity,
                serials.len()
            ),
        });
    }
    normalize_serial_list(serials).map_err(|message| AppError::Validation {
        field: "serials".to_string(),
        message,
    })
}

fn validate_snapshot_lines(lines: &[SnapshotLineInput]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::Validation {
            field: "recipe_items".to_string(),
            message: "At least one snapshot line is required".to_string(),
        });
    }
    let mut seen = std::collections::HashSet::new();
    for line in lines {
        if line.quantity_per_unit <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "quantity_per_unit".to_string(),
                message: format!(
                    "Quantity per unit for item {} must be positive",
                    line.raw_item_id
                ),
            });
        }
        if !seen.insert(line.raw_item_id.clone()) {
            return Err(AppError::Validation {
                field: "recipe_items".to_string(),
                message: format!("Raw item {} appears more than once", line.raw_item_id),
            });
        }
    }
    Ok(())
}

async fn lock_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: &str,
) -> AppResult<ProductionBatch> {
    sqlx::query_as::<_, ProductionBatch>(
        r#"
        SELECT id, final_product_id, quantity_produced, stage, created_at, updated_at
        FROM production_batches
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(batch_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Production batch {}", batch_id)))
}

/// Serial numbers are unique across all batches, compared
/// case-insensitively. `exclude_batch` skips a batch's own serials
/// when its list is being replaced.
async fn ensure_serials_unused(
    tx: &mut Transaction<'_, Postgres>,
    serials: &[String],
    exclude_batch: Option<&str>,
) -> AppResult<()> {
    let upper: Vec<String> = serials.iter().map(|s| s.to_uppercase()).collect();
    let taken: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT serial_number
        FROM production_serials
        WHERE UPPER(serial_number) = ANY($1)
          AND ($2::text IS NULL OR production_batch_id <> $2)
        "#,
    )
    .bind(&upper)
    .bind(exclude_batch)
    .fetch_all(&mut **tx)
    .await?;

    if !taken.is_empty() {
        return Err(AppError::DuplicateEntry(format!(
            "serial number(s) {}",
            taken.join(", ")
        )));
    }
    Ok(())
}

async fn insert_serials(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: &str,
    final_product_id: &str,
    serials: &[String],
) -> AppResult<()> {
    for serial in serials {
        sqlx::query(
            r#"
            INSERT INTO production_serials (production_batch_id, serial_number, final_product_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(batch_id)
        .bind(serial)
        .bind(final_product_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
