//! Direct supplier payment HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::direct_payment::{DirectPaymentService, PaySupplierInput};
use crate::AppState;

/// Pay a supplier across their outstanding invoices
pub async fn pay_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<i64>,
    Json(input): Json<PaySupplierInput>,
) -> impl IntoResponse {
    let service = DirectPaymentService::new(state.db.clone());

    match service.pay_supplier(supplier_id, input).await {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Preview a direct payment without persisting anything
pub async fn simulate_payment(
    State(state): State<AppState>,
    Path(supplier_id): Path<i64>,
    Json(input): Json<PaySupplierInput>,
) -> impl IntoResponse {
    let service = DirectPaymentService::new(state.db.clone());

    match service.simulate_payment(supplier_id, input).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Outstanding balance report for one supplier
pub async fn supplier_outstanding(
    State(state): State<AppState>,
    Path(supplier_id): Path<i64>,
) -> impl IntoResponse {
    let service = DirectPaymentService::new(state.db.clone());

    match service.outstanding(supplier_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}
