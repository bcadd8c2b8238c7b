//! Financial ledger HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::financial_ledger::{FinancialLedgerFilter, FinancialLedgerService};
use crate::AppState;

/// List debit/credit rows with filters and aggregate totals
pub async fn list_financial_ledger(
    State(state): State<AppState>,
    Query(filter): Query<FinancialLedgerFilter>,
) -> impl IntoResponse {
    let service = FinancialLedgerService::new(state.db.clone());

    match service.list(filter).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Balance report for one counterparty
pub async fn user_balance(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    let service = FinancialLedgerService::new(state.db.clone());

    match service.user_balance(user_id).await {
        Ok(balance) => (StatusCode::OK, Json(balance)).into_response(),
        Err(e) => e.into_response(),
    }
}
