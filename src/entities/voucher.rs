use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A discount code with a validity window, usage cap and a discount rule.
///
/// `used_count <= usage_limit` (when a limit is set) is enforced at
/// redemption time by a guarded atomic increment, see
/// `VoucherService::redeem`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub min_order_value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub max_discount_amount: Option<Decimal>,
    #[sea_orm(nullable)]
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    #[sea_orm(nullable)]
    pub created_by: Option<Uuid>,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum DiscountType {
    #[sea_orm(string_value = "Percentage")]
    Percentage,
    #[sea_orm(string_value = "FixedAmount")]
    FixedAmount,
}
