//! Production batch HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::services::production::{
    BatchFilter, CreateDraftInput, ProductionService, UpdateDraftInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct QuantityQuery {
    pub quantity: i64,
}

/// Requirements preview for producing N units
pub async fn production_preview(
    State(state): State<AppState>,
    Path(final_product_id): Path<String>,
    Query(query): Query<QuantityQuery>,
) -> impl IntoResponse {
    let service = ProductionService::new(state.db.clone());

    match service.preview(&final_product_id, query.quantity).await {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Feasibility report including the maximum producible quantity
pub async fn production_feasibility(
    State(state): State<AppState>,
    Path(final_product_id): Path<String>,
    Query(query): Query<QuantityQuery>,
) -> impl IntoResponse {
    let service = ProductionService::new(state.db.clone());

    match service.feasibility(&final_product_id, query.quantity).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a DRAFT batch
pub async fn create_draft(
    State(state): State<AppState>,
    Json(input): Json<CreateDraftInput>,
) -> impl IntoResponse {
    let service = ProductionService::new(state.db.clone());

    match service.create_draft(input).await {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Edit a DRAFT batch
pub async fn update_draft(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Json(input): Json<UpdateDraftInput>,
) -> impl IntoResponse {
    let service = ProductionService::new(state.db.clone());

    match service.update_draft(&batch_id, input).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DRAFT -> IN_PROCESS: consume raw materials
pub async fn execute_draft(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> impl IntoResponse {
    let service = ProductionService::new(state.db.clone());

    match service.execute_draft(&batch_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// IN_PROCESS -> DONE: credit the finished product
pub async fn complete_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> impl IntoResponse {
    let service = ProductionService::new(state.db.clone());

    match service.complete_batch(&batch_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a DRAFT batch
pub async fn delete_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> impl IntoResponse {
    let service = ProductionService::new(state.db.clone());

    match service.delete_batch(&batch_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Full batch report
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> impl IntoResponse {
    let service = ProductionService::new(state.db.clone());

    match service.get_batch(&batch_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List batches with filters
pub async fn list_batches(
    State(state): State<AppState>,
    Query(filter): Query<BatchFilter>,
) -> impl IntoResponse {
    let service = ProductionService::new(state.db.clone());

    match service.list_batches(filter).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}
