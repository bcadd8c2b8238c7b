//! Item-kind guards shared by the recipe and production services.

use shared::ItemKind;

use crate::error::{AppError, AppResult};

/// Verify the item exists and is a final product.
pub async fn ensure_final_product(
    executor: impl sqlx::PgExecutor<'_>,
    item_id: &str,
) -> AppResult<()> {
    ensure_kind(executor, item_id, ItemKind::FinalProduct, "final_product_id").await
}

/// Verify the item exists and is a raw material.
pub async fn ensure_raw_material(
    executor: impl sqlx::PgExecutor<'_>,
    item_id: &str,
) -> AppResult<()> {
    ensure_kind(executor, item_id, ItemKind::RawMaterial, "raw_item_id").await
}

async fn ensure_kind(
    executor: impl sqlx::PgExecutor<'_>,
    item_id: &str,
    expected: ItemKind,
    field: &str,
) -> AppResult<()> {
    let kind = sqlx::query_scalar::<_, ItemKind>("SELECT kind FROM items WHERE id = $1")
        .bind(item_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {}", item_id)))?;
    if kind != expected {
        let expected_label = match expected {
            ItemKind::FinalProduct => "a final product",
            ItemKind::RawMaterial => "a raw material",
        };
        return Err(AppError::Validation {
            field: field.to_string(),
            message: format!("Item {} is not {}", item_id, expected_label),
        });
    }
    Ok(())
}
