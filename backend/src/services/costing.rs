//! Weighted-average costing engine
//!
//! The only writer of `items.total_quantity` and `items.avg_price`.
//! The pure functions compute the new position; the async functions
//! apply it inside the caller's transaction, taking a row lock on the
//! item first so concurrent check-and-deduct cycles serialize.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};

use shared::{round_money, Item};

use crate::error::{AppError, AppResult, StockShortfall};

/// An item's running stock position: on-hand quantity and
/// weighted-average unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockPosition {
    pub quantity: i64,
    pub avg_price: Decimal,
}

/// Errors from the pure costing math, independent of any item identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostingError {
    InsufficientQuantity { available: i64, requested: i64 },
}

/// Incoming stock: new average is the quantity-weighted mean of the
/// old position and the new receipt. A zero denominator yields an
/// average of 0 rather than an error.
pub fn apply_incoming(position: StockPosition, qty: i64, unit_price: Decimal) -> StockPosition {
    let new_qty = position.quantity + qty;
    let avg_price = if new_qty == 0 {
        Decimal::ZERO
    } else {
        let total_value = position.avg_price * Decimal::from(position.quantity)
            + unit_price * Decimal::from(qty);
        total_value / Decimal::from(new_qty)
    };
    StockPosition {
        quantity: new_qty,
        avg_price,
    }
}

/// Outgoing stock: quantity drops, average cost is untouched.
/// Consuming more than is on hand is rejected outright.
pub fn apply_outgoing(position: StockPosition, qty: i64) -> Result<StockPosition, CostingError> {
    if qty > position.quantity {
        return Err(CostingError::InsufficientQuantity {
            available: position.quantity,
            requested: qty,
        });
    }
    Ok(StockPosition {
        quantity: position.quantity - qty,
        avg_price: position.avg_price,
    })
}

/// Reverse a previous receipt by algebraic subtraction, recomputing
/// the position as if that receipt had never happened. Exact only when
/// no other movement has touched the item since the receipt.
pub fn reverse_incoming(
    position: StockPosition,
    qty: i64,
    unit_price: Decimal,
) -> Result<StockPosition, CostingError> {
    if qty > position.quantity {
        return Err(CostingError::InsufficientQuantity {
            available: position.quantity,
            requested: qty,
        });
    }
    let new_qty = position.quantity - qty;
    let avg_price = if new_qty == 0 {
        Decimal::ZERO
    } else {
        let new_total_value = position.avg_price * Decimal::from(position.quantity)
            - unit_price * Decimal::from(qty);
        new_total_value / Decimal::from(new_qty)
    };
    Ok(StockPosition {
        quantity: new_qty,
        avg_price: avg_price.max(Decimal::ZERO),
    })
}

/// Fetch an item under a row lock so the read-modify-write below is
/// serialized against concurrent ledger operations.
pub async fn lock_item(tx: &mut Transaction<'_, Postgres>, item_id: &str) -> AppResult<Item> {
    sqlx::query_as::<_, Item>(
        r#"
        SELECT id, name, kind, unit_type, avg_price, standard_cost,
               total_quantity, created_at, updated_at
        FROM items
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(item_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Item {}", item_id)))
}

/// Receive stock into an item and recompute its weighted average.
pub async fn receive_stock(
    tx: &mut Transaction<'_, Postgres>,
    item_id: &str,
    qty: i64,
    unit_price: Decimal,
) -> AppResult<Item> {
    let item = lock_item(tx, item_id).await?;
    let position = apply_incoming(
        StockPosition {
            quantity: item.total_quantity,
            avg_price: item.avg_price,
        },
        qty,
        unit_price,
    );
    store_position(tx, item_id, position).await
}

/// Consume stock from an item; the average cost is unchanged.
pub async fn consume_stock(
    tx: &mut Transaction<'_, Postgres>,
    item_id: &str,
    qty: i64,
) -> AppResult<Item> {
    let item = lock_item(tx, item_id).await?;
    let position = apply_outgoing(
        StockPosition {
            quantity: item.total_quantity,
            avg_price: item.avg_price,
        },
        qty,
    )
    .map_err(|e| shortfall_error(&item, e))?;
    store_position(tx, item_id, position).await
}

/// Undo a previous receipt (invoice edit/delete before settlement).
pub async fn reverse_receipt(
    tx: &mut Transaction<'_, Postgres>,
    item_id: &str,
    qty: i64,
    unit_price: Decimal,
) -> AppResult<Item> {
    let item = lock_item(tx, item_id).await?;
    let position = reverse_incoming(
        StockPosition {
            quantity: item.total_quantity,
            avg_price: item.avg_price,
        },
        qty,
        unit_price,
    )
    .map_err(|e| shortfall_error(&item, e))?;
    store_position(tx, item_id, position).await
}

fn shortfall_error(item: &Item, err: CostingError) -> AppError {
    match err {
        CostingError::InsufficientQuantity {
            available,
            requested,
        } => AppError::InsufficientStock(vec![StockShortfall {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            required: Decimal::from(requested),
            available,
            shortfall: Decimal::from(requested - available),
        }]),
    }
}

async fn store_position(
    tx: &mut Transaction<'_, Postgres>,
    item_id: &str,
    position: StockPosition,
) -> AppResult<Item> {
    sqlx::query_as::<_, Item>(
        r#"
        UPDATE items
        SET total_quantity = $2, avg_price = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, kind, unit_type, avg_price, standard_cost,
                  total_quantity, created_at, updated_at
        "#,
    )
    .bind(item_id)
    .bind(position.quantity)
    .bind(round_money(position.avg_price))
    .fetch_one(&mut **tx)
    .await
    .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn pos(quantity: i64, avg: &str) -> StockPosition {
        StockPosition {
            quantity,
            avg_price: dec(avg),
        }
    }

    #[test]
    fn incoming_recomputes_weighted_average() {
        let p = apply_incoming(pos(0, "0"), 10, dec("2.00"));
        assert_eq!(p.quantity, 10);
        assert_eq!(p.avg_price, dec("2.00"));

        let p = apply_incoming(p, 5, dec("3.50"));
        assert_eq!(p.quantity, 15);
        assert_eq!(p.avg_price, dec("2.50"));
    }

    #[test]
    fn incoming_with_zero_total_yields_zero_average() {
        let p = apply_incoming(pos(0, "0"), 0, dec("9.99"));
        assert_eq!(p.quantity, 0);
        assert_eq!(p.avg_price, Decimal::ZERO);
    }

    #[test]
    fn outgoing_leaves_average_untouched() {
        let p = apply_outgoing(pos(15, "2.50"), 6).unwrap();
        assert_eq!(p.quantity, 9);
        assert_eq!(p.avg_price, dec("2.50"));
    }

    #[test]
    fn outgoing_rejects_overdraw() {
        let err = apply_outgoing(pos(3, "1.00"), 4).unwrap_err();
        assert_eq!(
            err,
            CostingError::InsufficientQuantity {
                available: 3,
                requested: 4
            }
        );
    }

    #[test]
    fn reversal_restores_prior_position() {
        let before = pos(10, "2.00");
        let after = apply_incoming(before, 5, dec("3.50"));
        let restored = reverse_incoming(after, 5, dec("3.50")).unwrap();
        assert_eq!(restored.quantity, before.quantity);
        assert_eq!(restored.avg_price, before.avg_price);
    }

    #[test]
    fn reversal_to_empty_zeroes_the_average() {
        let after = apply_incoming(pos(0, "0"), 10, dec("2.00"));
        let restored = reverse_incoming(after, 10, dec("2.00")).unwrap();
        assert_eq!(restored.quantity, 0);
        assert_eq!(restored.avg_price, Decimal::ZERO);
    }
}
