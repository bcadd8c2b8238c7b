//! Recipe HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::services::recipe::{CreateRecipeInput, RecipeService, UpdateRecipeInput};
use crate::AppState;

/// Create the recipe for a final product
pub async fn create_recipe(
    State(state): State<AppState>,
    Json(input): Json<CreateRecipeInput>,
) -> impl IntoResponse {
    let service = RecipeService::new(state.db.clone());

    match service.create_recipe(input).await {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a recipe with its lines and standard cost
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> impl IntoResponse {
    let service = RecipeService::new(state.db.clone());

    match service.get_recipe(&recipe_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get the recipe of a final product
pub async fn get_recipe_for_product(
    State(state): State<AppState>,
    Path(final_product_id): Path<String>,
) -> impl IntoResponse {
    let service = RecipeService::new(state.db.clone());

    match service.get_recipe_for_product(&final_product_id).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update a recipe's name and/or lines
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    Json(input): Json<UpdateRecipeInput>,
) -> impl IntoResponse {
    let service = RecipeService::new(state.db.clone());

    match service.update_recipe(&recipe_id, input).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Delete a recipe
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> impl IntoResponse {
    let service = RecipeService::new(state.db.clone());

    match service.delete_recipe(&recipe_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
