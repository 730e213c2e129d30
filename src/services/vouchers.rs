use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::voucher::{self, Column, DiscountType, Entity as Voucher, Model as VoucherModel},
    errors::ServiceError,
    services::payos::format_vnd,
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateVoucherRequest {
    #[validate(length(min = 1, max = 50, message = "Voucher code is required"))]
    pub code: String,
    #[validate(length(min = 1, message = "Voucher name is required"))]
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub min_order_value: Decimal,
    pub max_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateVoucherRequest {
    pub name: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_order_value: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListVouchersQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub is_active: Option<bool>,
    pub discount_type: Option<DiscountType>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoucherListResponse {
    pub vouchers: Vec<VoucherModel>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Outcome of validating a voucher code against an order value. Soft
/// failures carry `is_valid = false` and a message; nothing is mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherValidation {
    pub is_valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher: Option<VoucherModel>,
}

impl VoucherValidation {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            discount_amount: None,
            voucher: None,
        }
    }
}

#[derive(Clone)]
pub struct VoucherService {
    db: Arc<DatabaseConnection>,
}

impl VoucherService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn check_rules(
        discount_type: DiscountType,
        discount_value: Decimal,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if discount_value < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Discount value must be non-negative".to_string(),
            ));
        }
        if discount_type == DiscountType::Percentage && discount_value > Decimal::from(100) {
            return Err(ServiceError::ValidationError(
                "Percentage discount cannot exceed 100".to_string(),
            ));
        }
        if start_date >= end_date {
            return Err(ServiceError::ValidationError(
                "End date must be after start date".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create(&self, request: CreateVoucherRequest) -> Result<VoucherModel, ServiceError> {
        request.validate()?;
        Self::check_rules(
            request.discount_type,
            request.discount_value,
            request.start_date,
            request.end_date,
        )?;

        let existing = Voucher::find()
            .filter(Column::Code.eq(request.code.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Voucher code {} already exists",
                request.code
            )));
        }

        let now = Utc::now();
        let model = voucher::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(request.code),
            name: Set(request.name),
            discount_type: Set(request.discount_type),
            discount_value: Set(request.discount_value),
            start_date: Set(request.start_date),
            end_date: Set(request.end_date),
            min_order_value: Set(request.min_order_value),
            max_discount_amount: Set(request.max_discount_amount),
            usage_limit: Set(request.usage_limit),
            used_count: Set(0),
            is_active: Set(true),
            created_by: Set(request.created_by),
            description: Set(request.description),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await?;
        info!(voucher_id = %created.id, code = %created.code, "Voucher created");
        Ok(created)
    }

    #[instrument(skip(self, request), fields(voucher_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateVoucherRequest,
    ) -> Result<VoucherModel, ServiceError> {
        let existing = self.get(id).await?;

        let discount_type = request.discount_type.unwrap_or(existing.discount_type);
        let discount_value = request.discount_value.unwrap_or(existing.discount_value);
        let start_date = request.start_date.unwrap_or(existing.start_date);
        let end_date = request.end_date.unwrap_or(existing.end_date);
        Self::check_rules(discount_type, discount_value, start_date, end_date)?;

        let mut model: voucher::ActiveModel = existing.into();
        if let Some(name) = request.name {
            model.name = Set(name);
        }
        model.discount_type = Set(discount_type);
        model.discount_value = Set(discount_value);
        model.start_date = Set(start_date);
        model.end_date = Set(end_date);
        if let Some(min) = request.min_order_value {
            model.min_order_value = Set(min);
        }
        if request.max_discount_amount.is_some() {
            model.max_discount_amount = Set(request.max_discount_amount);
        }
        if request.usage_limit.is_some() {
            model.usage_limit = Set(request.usage_limit);
        }
        if let Some(active) = request.is_active {
            model.is_active = Set(active);
        }
        if request.description.is_some() {
            model.description = Set(request.description);
        }
        model.updated_at = Set(Utc::now());

        Ok(model.update(&*self.db).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<VoucherModel, ServiceError> {
        Voucher::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Voucher {id} not found")))
    }

    pub async fn get_by_code(&self, code: &str) -> Result<VoucherModel, ServiceError> {
        Voucher::find()
            .filter(Column::Code.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Voucher code {code} not found")))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Voucher::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Voucher {id} not found")));
        }
        info!(voucher_id = %id, "Voucher deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: ListVouchersQuery) -> Result<VoucherListResponse, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);

        let mut finder = Voucher::find();
        if let Some(active) = query.is_active {
            finder = finder.filter(Column::IsActive.eq(active));
        }
        if let Some(discount_type) = query.discount_type {
            finder = finder.filter(Column::DiscountType.eq(discount_type));
        }
        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{search}%");
            finder = finder.filter(
                Condition::any()
                    .add(Column::Code.like(pattern.clone()))
                    .add(Column::Name.like(pattern)),
            );
        }

        let paginator = finder
            .order_by_desc(Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let vouchers = paginator.fetch_page(page - 1).await?;

        Ok(VoucherListResponse {
            vouchers,
            total,
            page,
            limit,
        })
    }

    /// Vouchers currently usable: active, inside their window and with
    /// redemptions remaining.
    pub async fn list_active(&self) -> Result<Vec<VoucherModel>, ServiceError> {
        let now = Utc::now();
        let vouchers = Voucher::find()
            .filter(Column::IsActive.eq(true))
            .filter(Column::StartDate.lte(now))
            .filter(Column::EndDate.gte(now))
            .filter(
                Condition::any()
                    .add(Column::UsageLimit.is_null())
                    .add(Expr::col(Column::UsedCount).lt(Expr::col(Column::UsageLimit))),
            )
            .order_by_desc(Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(vouchers)
    }

    /// Checks a voucher code against an order value and computes the
    /// bounded discount. No side effects; redemption is a separate step.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn validate(
        &self,
        code: &str,
        order_value: Decimal,
    ) -> Result<VoucherValidation, ServiceError> {
        let voucher = match self.get_by_code(code).await {
            Ok(v) => v,
            Err(ServiceError::NotFound(_)) => {
                return Ok(VoucherValidation::invalid("Voucher code not found"))
            }
            Err(e) => return Err(e),
        };

        if !voucher.is_active {
            return Ok(VoucherValidation::invalid("Voucher is not active"));
        }

        let now = Utc::now();
        if now < voucher.start_date {
            return Ok(VoucherValidation::invalid("Voucher is not yet valid"));
        }
        if now > voucher.end_date {
            return Ok(VoucherValidation::invalid("Voucher has expired"));
        }

        if order_value < voucher.min_order_value {
            return Ok(VoucherValidation::invalid(format!(
                "Order must be worth at least {}",
                format_vnd(voucher.min_order_value)
            )));
        }

        if let Some(limit) = voucher.usage_limit {
            if voucher.used_count >= limit {
                warn!(code = %voucher.code, "Voucher usage limit reached");
                return Ok(VoucherValidation::invalid("Voucher usage limit reached"));
            }
        }

        let discount_amount = compute_discount(&voucher, order_value);
        Ok(VoucherValidation {
            is_valid: true,
            message: "Voucher is valid".to_string(),
            discount_amount: Some(discount_amount),
            voucher: Some(voucher),
        })
    }

    /// Redeems one use of the voucher with a guarded atomic increment.
    /// Returns `false` when the usage limit was exhausted concurrently;
    /// the caller must then abort (and roll back) the order.
    ///
    /// Runs on any connection so it can share the order-creation
    /// transaction.
    pub async fn redeem<C: ConnectionTrait>(
        &self,
        conn: &C,
        voucher_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let result = Voucher::update_many()
            .col_expr(
                Column::UsedCount,
                Expr::col(Column::UsedCount).add(1),
            )
            .filter(Column::Id.eq(voucher_id))
            .filter(
                Condition::any()
                    .add(Column::UsageLimit.is_null())
                    .add(Expr::col(Column::UsedCount).lt(Expr::col(Column::UsageLimit))),
            )
            .exec(conn)
            .await?;

        Ok(result.rows_affected == 1)
    }
}

/// Discount rule: percentage of the order value or a fixed amount, capped
/// by `max_discount_amount` when set and never exceeding the order value,
/// so the payable amount cannot go negative.
pub fn compute_discount(voucher: &VoucherModel, order_value: Decimal) -> Decimal {
    let raw = match voucher.discount_type {
        DiscountType::Percentage => order_value * voucher.discount_value / Decimal::from(100),
        DiscountType::FixedAmount => voucher.discount_value,
    };

    let capped = match voucher.max_discount_amount {
        Some(max) => raw.min(max),
        None => raw,
    };

    capped.min(order_value).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn voucher(discount_type: DiscountType, value: Decimal, max: Option<Decimal>) -> VoucherModel {
        let now = Utc::now();
        VoucherModel {
            id: Uuid::new_v4(),
            code: "WELCOME10".to_string(),
            name: "Welcome discount".to_string(),
            discount_type,
            discount_value: value,
            start_date: now,
            end_date: now,
            min_order_value: Decimal::ZERO,
            max_discount_amount: max,
            usage_limit: None,
            used_count: 0,
            is_active: true,
            created_by: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percentage_discount() {
        let v = voucher(DiscountType::Percentage, dec!(10), None);
        assert_eq!(compute_discount(&v, dec!(1000000)), dec!(100000));
    }

    #[test]
    fn percentage_discount_respects_cap() {
        let v = voucher(DiscountType::Percentage, dec!(10), Some(dec!(50000)));
        assert_eq!(compute_discount(&v, dec!(1000000)), dec!(50000));
    }

    #[test]
    fn fixed_discount_clamps_to_order_value() {
        let v = voucher(DiscountType::FixedAmount, dec!(500000), None);
        assert_eq!(compute_discount(&v, dec!(200000)), dec!(200000));
    }

    #[test]
    fn fixed_discount_below_order_value_is_unchanged() {
        let v = voucher(DiscountType::FixedAmount, dec!(50000), Some(dec!(80000)));
        assert_eq!(compute_discount(&v, dec!(200000)), dec!(50000));
    }
}
