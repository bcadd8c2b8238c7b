//! Purchase invoice HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::purchase::{
    AddPaymentInput, CreatePurchaseInput, InvoiceFilter, PurchaseService, UpdatePurchaseInput,
};
use crate::AppState;

/// Create a purchase invoice (optionally with an initial payment)
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(input): Json<CreatePurchaseInput>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.create_purchase(input).await {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List purchase invoices with filters
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(filter): Query<InvoiceFilter>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.list_invoices(filter).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get one invoice with its lines and payments
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.get_invoice(&invoice_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Replace an invoice's line items
pub async fn update_purchase(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    Json(input): Json<UpdatePurchaseInput>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.update_purchase(&invoice_id, input).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete an invoice and everything it caused
pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.delete_purchase(&invoice_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Pay part or all of one invoice
pub async fn add_payment(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    Json(input): Json<AddPaymentInput>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.add_payment(&invoice_id, input).await {
        Ok(payment) => (StatusCode::CREATED, Json(payment)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List payments of one invoice
pub async fn list_invoice_payments(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.invoice_payments(&invoice_id).await {
        Ok(payments) => (
            StatusCode::OK,
            Json(serde_json::json!({ "payments": payments })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Reverse one payment
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.delete_payment(&payment_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Per-supplier purchase totals and status counts
pub async fn purchase_summary(State(state): State<AppState>) -> impl IntoResponse {
    let service = PurchaseService::new(state.db.clone());

    match service.purchase_summary().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(serde_json::json!({ "suppliers": summary })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
