use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::carts::{AddItemRequest, CartResponse},
    ApiResponse, AppState,
};

#[derive(Debug, serde::Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

pub async fn get_cart(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CartResponse>>, ServiceError> {
    let cart = state.services.carts.get_cart(customer_id).await?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn add_cart_item(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CartResponse>>), ServiceError> {
    let cart = state.services.carts.add_item(customer_id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(cart))))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    Path((customer_id, product_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<ApiResponse<CartResponse>>, ServiceError> {
    let cart = state
        .services
        .carts
        .update_item_quantity(customer_id, product_id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path((customer_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<CartResponse>>, ServiceError> {
    let cart = state
        .services
        .carts
        .remove_item(customer_id, product_id)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.carts.clear_cart(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
