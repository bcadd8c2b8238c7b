//! Production batch models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductionStage;

/// One manufacturing run of N units of a final product.
/// Stage lifecycle: DRAFT (no inventory effect) -> IN_PROCESS (raw
/// items deducted) -> DONE (finished quantity credited).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductionBatch {
    pub id: String,
    pub final_product_id: String,
    pub quantity_produced: i64,
    pub stage: ProductionStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One unique serial number per produced unit, `LEH-` prefixed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductionSerial {
    pub id: i64,
    pub production_batch_id: String,
    pub serial_number: String,
    pub final_product_id: String,
}

/// Snapshot of the master recipe taken when the batch was drafted.
/// Editable per batch while in DRAFT, independent of the master recipe.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductionBatchRecipeItem {
    pub id: i64,
    pub production_batch_id: String,
    pub raw_item_id: String,
    pub quantity_per_unit: Decimal,
}
