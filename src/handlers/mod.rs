pub mod carts;
pub mod orders;
pub mod vouchers;

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    events::EventSender,
    services::{
        carts::CartService,
        orders::OrderService,
        payos::PaymentGateway,
        vouchers::VoucherService,
    },
};

/// Service container shared through the application state.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub vouchers: VoucherService,
    pub carts: CartService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> Self {
        let vouchers = VoucherService::new(db.clone());
        let carts = CartService::new(db.clone());
        let orders = OrderService::new(
            db,
            gateway,
            vouchers.clone(),
            event_sender,
            Decimal::from(config.default_shipping_fee),
        );
        Self {
            orders,
            vouchers,
            carts,
        }
    }
}
