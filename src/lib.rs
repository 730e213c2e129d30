pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Uniform JSON envelope for every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    let orders = Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/orders/:id/payments",
            get(handlers::orders::get_order_payments),
        )
        .route("/orders/:id/cancel", patch(handlers::orders::cancel_order))
        .route(
            "/orders/:id/status",
            patch(handlers::orders::override_order_status),
        )
        .route(
            "/orders/payos/webhook",
            post(handlers::orders::payos_webhook),
        )
        .route(
            "/orders/confirm-payment",
            post(handlers::orders::confirm_payment),
        );

    let vouchers = Router::new()
        .route("/vouchers", post(handlers::vouchers::create_voucher))
        .route("/vouchers", get(handlers::vouchers::list_vouchers))
        .route(
            "/vouchers/active",
            get(handlers::vouchers::list_active_vouchers),
        )
        .route(
            "/vouchers/validate",
            post(handlers::vouchers::validate_voucher),
        )
        .route("/vouchers/:id", get(handlers::vouchers::get_voucher))
        .route("/vouchers/:id", patch(handlers::vouchers::update_voucher))
        .route("/vouchers/:id", delete(handlers::vouchers::delete_voucher));

    let carts = Router::new()
        .route("/carts/:customer_id", get(handlers::carts::get_cart))
        .route("/carts/:customer_id", delete(handlers::carts::clear_cart))
        .route(
            "/carts/:customer_id/items",
            post(handlers::carts::add_cart_item),
        )
        .route(
            "/carts/:customer_id/items/:product_id",
            put(handlers::carts::update_cart_item),
        )
        .route(
            "/carts/:customer_id/items/:product_id",
            delete(handlers::carts::remove_cart_item),
        );

    Router::new().merge(orders).merge(vouchers).merge(carts)
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

/// Builds the full application router with middleware applied.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
