//! Recipe (bill-of-materials) service
//!
//! Exactly one recipe per final product. Raw items are unique within a
//! recipe; saving a recipe recomputes the final product's standard
//! cost (Σ quantity_per_unit × raw avg_price) into its dedicated
//! `standard_cost` field, leaving the purchased weighted average
//! alone. Recipes for products with any DONE production batch are
//! frozen so the historical cost basis of completed batches survives.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use shared::{round_money, Recipe, RECIPE_PREFIX};

use crate::error::{AppError, AppResult};
use crate::services::ids::{self, CodeTable};
use crate::services::items::{ensure_final_product, ensure_raw_material};

/// Recipe service
#[derive(Clone)]
pub struct RecipeService {
    db: PgPool,
}

/// One requested recipe line.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeItemInput {
    pub raw_item_id: String,
    pub quantity_per_unit: Decimal,
}

/// Input for creating a recipe.
#[derive(Debug, Deserialize)]
pub struct CreateRecipeInput {
    pub final_product_id: String,
    pub name: Option<String>,
    pub items: Vec<RecipeItemInput>,
}

/// Input for updating a recipe. Omitted fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateRecipeInput {
    pub name: Option<String>,
    pub items: Option<Vec<RecipeItemInput>>,
}

/// Recipe line joined with the raw item's name and current cost.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecipeLine {
    pub id: i64,
    pub raw_item_id: String,
    pub raw_item_name: String,
    pub quantity_per_unit: Decimal,
    pub raw_avg_price: Decimal,
    pub line_cost: Decimal,
}

/// Recipe with its lines and the standard cost they imply.
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub final_product_name: String,
    pub items: Vec<RecipeLine>,
    pub standard_cost: Decimal,
}

/// Standard cost of building one unit: Σ quantity_per_unit × raw
/// average price, over `(quantity_per_unit, avg_price)` pairs.
pub fn standard_cost(lines: &[(Decimal, Decimal)]) -> Decimal {
    round_money(lines.iter().map(|(qty, price)| qty * price).sum())
}

impl RecipeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the recipe for a final product.
    pub async fn create_recipe(&self, input: CreateRecipeInput) -> AppResult<RecipeDetail> {
        validate_lines(&input.items)?;

        let mut tx = self.db.begin().await?;

        ensure_final_product(&mut *tx, &input.final_product_id).await?;
        ensure_no_done_batches(&mut tx, &input.final_product_id).await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recipes WHERE final_product_id = $1)")
                .bind(&input.final_product_id)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            return Err(AppError::DuplicateEntry(format!(
                "recipe for product {}",
                input.final_product_id
            )));
        }

        let recipe_id = ids::unique_code(&mut tx, CodeTable::Recipes, RECIPE_PREFIX, 8).await?;
        sqlx::query("INSERT INTO recipes (id, final_product_id, name) VALUES ($1, $2, $3)")
            .bind(&recipe_id)
            .bind(&input.final_product_id)
            .bind(&input.name)
            .execute(&mut *tx)
            .await?;

        replace_lines(&mut tx, &recipe_id, &input.items).await?;
        refresh_standard_cost(&mut tx, &recipe_id, &input.final_product_id).await?;

        tx.commit().await?;

        tracing::info!(%recipe_id, final_product_id = %input.final_product_id,
            "Created recipe");

        self.get_recipe(&recipe_id).await
    }

    /// Update a recipe's name and/or replace its lines.
    pub async fn update_recipe(
        &self,
        recipe_id: &str,
        input: UpdateRecipeInput,
    ) -> AppResult<RecipeDetail> {
        if let Some(items) = &input.items {
            validate_lines(items)?;
        }

        let mut tx = self.db.begin().await?;

        let recipe = fetch_recipe(&mut tx, recipe_id).await?;
        ensure_no_done_batches(&mut tx, &recipe.final_product_id).await?;

        if let Some(name) = &input.name {
            sqlx::query("UPDATE recipes SET name = $2, updated_at = NOW() WHERE id = $1")
                .bind(recipe_id)
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(items) = &input.items {
            sqlx::query("DELETE FROM recipe_items WHERE recipe_id = $1")
                .bind(recipe_id)
                .execute(&mut *tx)
                .await?;
            replace_lines(&mut tx, recipe_id, items).await?;
            sqlx::query("UPDATE recipes SET updated_at = NOW() WHERE id = $1")
                .bind(recipe_id)
                .execute(&mut *tx)
                .await?;
        }

        refresh_standard_cost(&mut tx, recipe_id, &recipe.final_product_id).await?;

        tx.commit().await?;

        tracing::info!(%recipe_id, "Updated recipe");

        self.get_recipe(recipe_id).await
    }

    /// Delete a recipe and clear the product's standard cost.
    pub async fn delete_recipe(&self, recipe_id: &str) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let recipe = fetch_recipe(&mut tx, recipe_id).await?;
        ensure_no_done_batches(&mut tx, &recipe.final_product_id).await?;

        sqlx::query("DELETE FROM recipe_items WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE items SET standard_cost = NULL, updated_at = NOW() WHERE id = $1")
            .bind(&recipe.final_product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%recipe_id, final_product_id = %recipe.final_product_id,
            "Deleted recipe");

        Ok(())
    }

    /// Fetch a recipe with its lines and current standard cost.
    pub async fn get_recipe(&self, recipe_id: &str) -> AppResult<RecipeDetail> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, final_product_id, name, created_at, updated_at
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(recipe_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recipe {}", recipe_id)))?;

        let final_product_name: String = sqlx::query_scalar("SELECT name FROM items WHERE id = $1")
            .bind(&recipe.final_product_id)
            .fetch_one(&self.db)
            .await?;

        let items = self.recipe_lines(recipe_id).await?;
        let total = standard_cost(
            &items
                .iter()
                .map(|l| (l.quantity_per_unit, l.raw_avg_price))
                .collect::<Vec<_>>(),
        );

        Ok(RecipeDetail {
            recipe,
            final_product_name,
            items,
            standard_cost: total,
        })
    }

    /// Fetch the recipe of a final product.
    pub async fn get_recipe_for_product(&self, final_product_id: &str) -> AppResult<RecipeDetail> {
        let recipe_id: String =
            sqlx::query_scalar("SELECT id FROM recipes WHERE final_product_id = $1")
                .bind(final_product_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Recipe for product {}", final_product_id))
                })?;
        self.get_recipe(&recipe_id).await
    }

    async fn recipe_lines(&self, recipe_id: &str) -> AppResult<Vec<RecipeLine>> {
        let lines = sqlx::query_as::<_, RecipeLine>(
            r#"
            SELECT ri.id, ri.raw_item_id, i.name AS raw_item_name,
                   ri.quantity_per_unit, i.avg_price AS raw_avg_price,
                   (ri.quantity_per_unit * i.avg_price) AS line_cost
            FROM recipe_items ri
            JOIN items i ON i.id = ri.raw_item_id
            WHERE ri.recipe_id = $1
            ORDER BY ri.id
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&self.db)
        .await?;
        Ok(lines)
    }
}

fn validate_lines(lines: &[RecipeItemInput]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::Validation {
            field: "items".to_string(),
            message: "A recipe needs at least one raw item".to_string(),
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
                field: "items".to_string(),
                message: format!("Raw item {} appears more than once", line.raw_item_id),
            });
        }
    }
    Ok(())
}

async fn fetch_recipe(tx: &mut Transaction<'_, Postgres>, recipe_id: &str) -> AppResult<Recipe> {
    sqlx::query_as::<_, Recipe>(
        "SELECT id, final_product_id, name, created_at, updated_at FROM recipes WHERE id = $1",
    )
    .bind(recipe_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Recipe {}", recipe_id)))
}

/// Completed batches freeze the recipe of their product.
async fn ensure_no_done_batches(
    tx: &mut Transaction<'_, Postgres>,
    final_product_id: &str,
) -> AppResult<()> {
    let done: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM production_batches
            WHERE final_product_id = $1 AND stage = 'DONE'
        )
        "#,
    )
    .bind(final_product_id)
    .fetch_one(&mut **tx)
    .await?;
    if done {
        return Err(AppError::Conflict {
            resource: "recipe".to_string(),
            message: format!(
                "Product {} has completed production batches; its recipe is frozen",
                final_product_id
            ),
        });
    }
    Ok(())
}

async fn replace_lines(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: &str,
    lines: &[RecipeItemInput],
) -> AppResult<()> {
    for line in lines {
        ensure_raw_material(&mut **tx, &line.raw_item_id).await?;
        sqlx::query(
            r#"
            INSERT INTO recipe_items (recipe_id, raw_item_id, quantity_per_unit)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(recipe_id)
        .bind(&line.raw_item_id)
        .bind(line.quantity_per_unit)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Recompute and store the product's standard cost from the recipe's
/// current lines and the raw items' current average prices.
async fn refresh_standard_cost(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: &str,
    final_product_id: &str,
) -> AppResult<Decimal> {
    let lines = sqlx::query_as::<_, (Decimal, Decimal)>(
        r#"
        SELECT ri.quantity_per_unit, i.avg_price
        FROM recipe_items ri
        JOIN items i ON i.id = ri.raw_item_id
        WHERE ri.recipe_id = $1
        "#,
    )
    .bind(recipe_id)
    .fetch_all(&mut **tx)
    .await?;

    let cost = standard_cost(&lines);
    sqlx::query("UPDATE items SET standard_cost = $2, updated_at = NOW() WHERE id = $1")
        .bind(final_product_id)
        .bind(cost)
        .execute(&mut **tx)
        .await?;
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn standard_cost_sums_weighted_lines() {
        // 4 units of a raw item at avg 90 -> 360 per finished unit
        assert_eq!(standard_cost(&[(dec("4"), dec("90"))]), dec("360.00"));
        assert_eq!(
            standard_cost(&[(dec("2"), dec("10.50")), (dec("0.5"), dec("8"))]),
            dec("25.00")
        );
    }

    #[test]
    fn standard_cost_of_empty_recipe_is_zero() {
        assert_eq!(standard_cost(&[]), Decimal::ZERO);
    }

    #[test]
    fn duplicate_raw_items_rejected() {
        let lines = vec![
            RecipeItemInput {
                raw_item_id: "ITM-AAAA".to_string(),
                quantity_per_unit: dec("1"),
            },
            RecipeItemInput {
                raw_item_id: "ITM-AAAA".to_string(),
                quantity_per_unit: dec("2"),
            },
        ];
        assert!(validate_lines(&lines).is_err());
    }

    #[test]
    fn nonpositive_quantity_rejected() {
        let lines = vec![RecipeItemInput {
            raw_item_id: "ITM-AAAA".to_string(),
            quantity_per_unit: dec("0"),
        }];
        assert!(validate_lines(&lines).is_err());
    }
}
