use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::voucher::Model as VoucherModel,
    errors::ServiceError,
    services::vouchers::{
        CreateVoucherRequest, ListVouchersQuery, UpdateVoucherRequest, VoucherListResponse,
        VoucherValidation,
    },
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateVoucherRequest {
    #[validate(length(min = 1, message = "Voucher code is required"))]
    pub code: String,
    pub order_value: Decimal,
}

pub async fn create_voucher(
    State(state): State<AppState>,
    Json(request): Json<CreateVoucherRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VoucherModel>>), ServiceError> {
    let voucher = state.services.vouchers.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(voucher))))
}

pub async fn list_vouchers(
    State(state): State<AppState>,
    Query(query): Query<ListVouchersQuery>,
) -> Result<Json<ApiResponse<VoucherListResponse>>, ServiceError> {
    let response = state.services.vouchers.list(query).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Vouchers currently inside their validity window with usage remaining.
pub async fn list_active_vouchers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<VoucherModel>>>, ServiceError> {
    let vouchers = state.services.vouchers.list_active().await?;
    Ok(Json(ApiResponse::success(vouchers)))
}

pub async fn get_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<VoucherModel>>, ServiceError> {
    let voucher = state.services.vouchers.get(id).await?;
    Ok(Json(ApiResponse::success(voucher)))
}

pub async fn update_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVoucherRequest>,
) -> Result<Json<ApiResponse<VoucherModel>>, ServiceError> {
    let voucher = state.services.vouchers.update(id, request).await?;
    Ok(Json(ApiResponse::success(voucher)))
}

pub async fn delete_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.vouchers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Soft validation for storefront preview: ineligible codes come back as
/// `is_valid = false` with a reason, not as an error status.
pub async fn validate_voucher(
    State(state): State<AppState>,
    Json(request): Json<ValidateVoucherRequest>,
) -> Result<Json<ApiResponse<VoucherValidation>>, ServiceError> {
    request.validate()?;
    let validation = state
        .services
        .vouchers
        .validate(&request.code, request.order_value)
        .await?;
    Ok(Json(ApiResponse::success(validation)))
}
