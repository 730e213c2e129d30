use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer's purchase request with line items and computed totals.
///
/// `final_amount = subtotal - discount_amount + shipping_fee` holds at
/// creation time and is never re-derived afterwards.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-readable code, `ORD-YYYYMMDD-XXXXXX`
    pub order_code: String,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub shipping_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub final_amount: Decimal,
    pub shipping_address: String,
    #[sea_orm(nullable)]
    pub recipient_name: Option<String>,
    #[sea_orm(nullable)]
    pub recipient_phone: Option<String>,
    /// Voucher applied at creation, if any
    #[sea_orm(nullable)]
    pub voucher_id: Option<Uuid>,
    /// Admin handling the order
    #[sea_orm(nullable)]
    pub processed_by: Option<Uuid>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order lifecycle states with an explicit transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "shipping")]
    Shipping,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipping => "shipping",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// `success` and `failed` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Transition table. Payment confirmation drives `pending -> confirmed`;
    /// cancellation and payment failure drive `pending|confirmed|shipping ->
    /// failed`; the fulfilment path `confirmed -> shipping -> success` is
    /// reachable only through the administrative override.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Failed)
                | (Confirmed, Shipping)
                | (Confirmed, Failed)
                | (Shipping, Success)
                | (Shipping, Failed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipping" => Ok(Self::Shipping),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}
