//! Item model: a stocked good, raw material or final product

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ItemKind, UnitType};

/// A stocked item.
///
/// `total_quantity` and `avg_price` are running aggregates owned by the
/// costing engine; nothing else writes them. `standard_cost` is the
/// recipe-derived cost to build one unit of a final product and is
/// written only on recipe save — the two cost fields are deliberately
/// separate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub unit_type: UnitType,
    /// Weighted-average unit cost from purchases.
    pub avg_price: Decimal,
    /// Recipe standard cost per unit; only set for final products with a recipe.
    pub standard_cost: Option<Decimal>,
    /// Current on-hand quantity, never negative.
    pub total_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
