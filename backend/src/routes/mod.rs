//! Route definitions for the Lehem ERP backend

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/purchases", purchase_routes())
        .nest("/payments", payment_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/production", production_routes())
        .nest("/recipes", recipe_routes())
        .nest("/ledger", ledger_routes())
}

/// Purchase invoice routes
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchases).post(handlers::create_purchase),
        )
        .route("/summary", get(handlers::purchase_summary))
        .route(
            "/:invoice_id",
            get(handlers::get_purchase)
                .put(handlers::update_purchase)
                .delete(handlers::delete_purchase),
        )
        .route(
            "/:invoice_id/payments",
            get(handlers::list_invoice_payments).post(handlers::add_payment),
        )
}

/// Standalone payment routes
fn payment_routes() -> Router<AppState> {
    Router::new().route("/:payment_id", axum::routing::delete(handlers::delete_payment))
}

/// Supplier-level payment routes
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/:supplier_id/payments", post(handlers::pay_supplier))
        .route(
            "/:supplier_id/payments/simulate",
            post(handlers::simulate_payment),
        )
        .route(
            "/:supplier_id/outstanding",
            get(handlers::supplier_outstanding),
        )
}

/// Production routes
fn production_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/batches",
            get(handlers::list_batches).post(handlers::create_draft),
        )
        .route(
            "/batches/:batch_id",
            get(handlers::get_batch)
                .put(handlers::update_draft)
                .delete(handlers::delete_batch),
        )
        .route("/batches/:batch_id/execute", post(handlers::execute_draft))
        .route("/batches/:batch_id/complete", post(handlers::complete_batch))
        .route(
            "/preview/:final_product_id",
            get(handlers::production_preview),
        )
        .route(
            "/feasibility/:final_product_id",
            get(handlers::production_feasibility),
        )
}

/// Recipe routes
fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_recipe))
        .route(
            "/:recipe_id",
            get(handlers::get_recipe)
                .put(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
        .route(
            "/product/:final_product_id",
            get(handlers::get_recipe_for_product),
        )
}

/// Ledger query routes
fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(handlers::list_stock_ledger))
        .route("/stock/items/:item_id", get(handlers::item_stock_summary))
        .route("/financial", get(handlers::list_financial_ledger))
        .route("/financial/users/:user_id", get(handlers::user_balance))
}
