//! Recipe (bill of materials) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Master recipe, exactly one per final product.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: String,
    pub final_product_id: String,
    /// Optional display name, e.g. "Noodles Recipe".
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw item required per one unit of the final product.
/// A raw item appears at most once per recipe.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeItem {
    pub id: i64,
    pub recipe_id: String,
    pub raw_item_id: String,
    pub quantity_per_unit: Decimal,
}
