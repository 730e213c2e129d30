use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{cart, cart_item},
    errors::ServiceError,
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: cart::Model,
    pub items: Vec<cart_item::Model>,
    pub subtotal: Decimal,
}

/// Shopping cart operations. `clear_cart` is the side-effect hook the
/// order flow invokes after a confirmed payment.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn get_or_create(&self, customer_id: Uuid) -> Result<cart::Model, ServiceError> {
        if let Some(existing) = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let now = Utc::now();
        let model = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&*self.db).await?)
    }

    #[instrument(skip(self, request), fields(customer_id = %customer_id, product_id = %request.product_id))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        request: AddItemRequest,
    ) -> Result<CartResponse, ServiceError> {
        request.validate()?;
        let cart = self.get_or_create(customer_id).await?;

        let existing = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(request.product_id))
            .one(&*self.db)
            .await?;

        match existing {
            // Same product added again merges quantities
            Some(item) => {
                let quantity = item.quantity + request.quantity;
                let mut model: cart_item::ActiveModel = item.into();
                model.quantity = Set(quantity);
                model.unit_price = Set(request.unit_price);
                model.update(&*self.db).await?;
            }
            None => {
                let model = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(request.product_id),
                    quantity: Set(request.quantity),
                    unit_price: Set(request.unit_price),
                    added_at: Set(Utc::now()),
                };
                model.insert(&*self.db).await?;
            }
        }

        self.get_cart(customer_id).await
    }

    #[instrument(skip(self), fields(customer_id = %customer_id, product_id = %product_id))]
    pub async fn update_item_quantity(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartResponse, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be non-negative".to_string(),
            ));
        }

        let cart = self.require_cart(customer_id).await?;
        let item = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not in cart".to_string()))?;

        if quantity == 0 {
            cart_item::Entity::delete_by_id(item.id).exec(&*self.db).await?;
        } else {
            let mut model: cart_item::ActiveModel = item.into();
            model.quantity = Set(quantity);
            model.update(&*self.db).await?;
        }

        self.get_cart(customer_id).await
    }

    pub async fn remove_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartResponse, ServiceError> {
        self.update_item_quantity(customer_id, product_id, 0).await
    }

    async fn require_cart(&self, customer_id: Uuid) -> Result<cart::Model, ServiceError> {
        cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart for customer {customer_id} not found"))
            })
    }

    pub async fn get_cart(&self, customer_id: Uuid) -> Result<CartResponse, ServiceError> {
        let cart = self.get_or_create(customer_id).await?;
        let items = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&*self.db)
            .await?;

        let subtotal = items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();

        Ok(CartResponse {
            cart,
            items,
            subtotal,
        })
    }

    /// Empties the customer's cart. Invoked as a post-confirmation side
    /// effect; callers log failures and move on.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn clear_cart(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let Some(cart) = cart::Entity::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
        else {
            // Nothing to clear for a customer who never built a cart.
            return Ok(());
        };

        let deleted = cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;

        info!(
            customer_id = %customer_id,
            items_removed = deleted.rows_affected,
            "Cart cleared"
        );
        Ok(())
    }
}
