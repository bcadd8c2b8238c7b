//! Stock ledger HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::stock_ledger::{StockLedgerFilter, StockLedgerService};
use crate::AppState;

/// List stock movements with filters and aggregate totals
pub async fn list_stock_ledger(
    State(state): State<AppState>,
    Query(filter): Query<StockLedgerFilter>,
) -> impl IntoResponse {
    let service = StockLedgerService::new(state.db.clone());

    match service.list(filter).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Current position and lifetime movement totals for one item
pub async fn item_stock_summary(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> impl IntoResponse {
    let service = StockLedgerService::new(state.db.clone());

    match service.item_summary(&item_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}
