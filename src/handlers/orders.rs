use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    entities::order::OrderStatus,
    entities::payment::Model as PaymentModel,
    errors::ServiceError,
    services::orders::{
        ConfirmPaymentRequest, ConfirmPaymentResponse, CreateOrderRequest, CreateOrderResponse,
        ListOrdersQuery, OrderListResponse,
    },
    services::payos::PayOsWebhook,
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OverrideStatusRequest {
    pub status: OrderStatus,
    pub admin_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct OrderDetailResponse {
    pub order: crate::entities::order::Model,
    pub items: Vec<crate::entities::order_item::Model>,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateOrderResponse>>), ServiceError> {
    let response = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let response = state.services.orders.list_orders(query).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// `id` may be either the order uuid or the human-readable order code.
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderDetailResponse>>, ServiceError> {
    let order = state.services.orders.get_order(&id).await?;
    let items = state.services.orders.order_items(order.id).await?;
    Ok(Json(ApiResponse::success(OrderDetailResponse {
        order,
        items,
    })))
}

pub async fn get_order_payments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PaymentModel>>>, ServiceError> {
    let order = state.services.orders.get_order(&id).await?;
    let payments = state.services.orders.payments_for_order(order.id).await?;
    Ok(Json(ApiResponse::success(payments)))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<CancelOrderRequest>>,
) -> Result<Json<ApiResponse<crate::entities::order::Model>>, ServiceError> {
    let order = state.services.orders.get_order(&id).await?;
    let reason = request.and_then(|Json(r)| r.reason);
    let updated = state.services.orders.cancel_order(order.id, reason).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn override_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OverrideStatusRequest>,
) -> Result<Json<ApiResponse<crate::entities::order::Model>>, ServiceError> {
    let order = state.services.orders.get_order(&id).await?;
    let updated = state
        .services
        .orders
        .override_status(order.id, request.status, request.admin_id, request.notes)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// PayOS calls this endpoint; the payload is signature-verified, not
/// session-authenticated. Always answers 200 on processed payloads so
/// the gateway stops retrying.
pub async fn payos_webhook(
    State(state): State<AppState>,
    Json(webhook): Json<PayOsWebhook>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.orders.handle_webhook(webhook).await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<ApiResponse<ConfirmPaymentResponse>>, ServiceError> {
    let response = state.services.orders.confirm_payment(request).await?;
    Ok(Json(ApiResponse::success(response)))
}
