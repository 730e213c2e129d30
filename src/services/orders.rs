use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::order::{self, Entity as Order, Model as OrderModel, OrderStatus},
    entities::order_item::{self, Entity as OrderItem, Model as OrderItemModel},
    entities::payment::{self, Entity as Payment, Model as PaymentModel, PaymentMethod, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::payos::{self, CreatePaymentLinkRequest, PaymentGateway, PaymentItem, PayOsWebhook},
    services::vouchers::VoucherService,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    #[serde(default)]
    pub discount_applied: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
    pub payment_method: PaymentMethod,
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub voucher_code: Option<String>,
    pub shipping_fee: Option<Decimal>,
    pub notes: Option<String>,
}

/// Order creation always returns the persisted order; `payment_url` is
/// only present when a hosted-checkout link was obtained, and `message`
/// explains which case occurred.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    pub payment_url: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    /// Order uuid or human-readable order code
    #[validate(length(min = 1, message = "Order identifier is required"))]
    pub order_id: String,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub order: OrderModel,
    pub payment: Option<PaymentModel>,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    /// Matches order code, recipient name or phone
    pub search: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderModel>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Orchestrates the order lifecycle: creation with voucher application,
/// payment-method branching, webhook/callback reconciliation and
/// cancellation. All collaborators are injected so tests can script the
/// gateway and observe emitted events.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    vouchers: VoucherService,
    event_sender: EventSender,
    default_shipping_fee: Decimal,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        vouchers: VoucherService,
        event_sender: EventSender,
        default_shipping_fee: Decimal,
    ) -> Self {
        Self {
            db,
            gateway,
            vouchers,
            event_sender,
            default_shipping_fee,
        }
    }

    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ServiceError> {
        request.validate()?;
        for item in &request.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "Item quantity must be at least 1".to_string(),
                ));
            }
            if item.price_at_purchase < Decimal::ZERO || item.discount_applied < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Item amounts must be non-negative".to_string(),
                ));
            }
        }

        let shipping_fee = request.shipping_fee.unwrap_or(self.default_shipping_fee);
        if shipping_fee < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Shipping fee must be non-negative".to_string(),
            ));
        }

        let subtotal: Decimal = request
            .items
            .iter()
            .map(|i| i.price_at_purchase * Decimal::from(i.quantity))
            .sum();

        // Voucher validation happens before any persistence; an invalid
        // code rejects the whole order.
        let mut discount_amount = Decimal::ZERO;
        let mut applied_voucher_id = None;
        if let Some(code) = request.voucher_code.as_deref() {
            let validation = self.vouchers.validate(code, subtotal).await?;
            if !validation.is_valid {
                return Err(ServiceError::ValidationError(validation.message));
            }
            discount_amount = validation.discount_amount.unwrap_or(Decimal::ZERO);
            applied_voucher_id = validation.voucher.map(|v| v.id);
        }

        let final_amount = subtotal - discount_amount + shipping_fee;
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_code = generate_order_code(now);

        // Order insert, line items and voucher redemption share one
        // transaction: a concurrently exhausted voucher rolls everything
        // back.
        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_code: Set(order_code),
            customer_id: Set(request.customer_id),
            status: Set(OrderStatus::Pending),
            order_date: Set(now),
            subtotal: Set(subtotal),
            discount_amount: Set(discount_amount),
            shipping_fee: Set(shipping_fee),
            final_amount: Set(final_amount),
            shipping_address: Set(request.shipping_address.clone()),
            recipient_name: Set(request.recipient_name.clone()),
            recipient_phone: Set(request.recipient_phone.clone()),
            voucher_id: Set(applied_voucher_id),
            processed_by: Set(None),
            notes: Set(request.notes.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let model = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price_at_purchase: Set(item.price_at_purchase),
                discount_applied: Set(item.discount_applied),
            }
            .insert(&txn)
            .await?;
            items.push(model);
        }

        if let Some(voucher_id) = applied_voucher_id {
            let redeemed = self.vouchers.redeem(&txn, voucher_id).await?;
            if !redeemed {
                // Limit hit between validation and redemption; dropping
                // the transaction rolls the order back.
                warn!(voucher_id = %voucher_id, "Voucher exhausted during order creation");
                return Err(ServiceError::ValidationError(
                    "Voucher usage limit reached".to_string(),
                ));
            }
        }

        txn.commit().await?;
        info!(order_id = %order_id, order_code = %order_model.order_code, "Order created");

        if let Err(e) = self.event_sender.send(Event::OrderCreated(order_id)).await {
            warn!(order_id = %order_id, error = %e, "Failed to send order created event");
        }

        let (payment_url, message) = match request.payment_method {
            PaymentMethod::Cash => {
                self.create_cash_payment(&order_model).await?;
                (
                    None,
                    "Order created. Payment is due on delivery.".to_string(),
                )
            }
            PaymentMethod::Payos => self.create_payos_payment(&order_model, &items).await?,
        };

        Ok(CreateOrderResponse {
            order: order_model,
            items,
            payment_url,
            message,
        })
    }

    async fn create_cash_payment(&self, order: &OrderModel) -> Result<PaymentModel, ServiceError> {
        let now = Utc::now();
        let model = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            method: Set(PaymentMethod::Cash),
            status: Set(PaymentStatus::Pending),
            amount: Set(order.final_amount),
            transaction_code: Set(None),
            payos_order_code: Set(None),
            payos_payment_link_id: Set(None),
            verified_by: Set(None),
            notes: Set(Some("Cash on delivery".to_string())),
            payment_date: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&*self.db).await?)
    }

    /// Requests a hosted-checkout link. Gateway failure degrades the
    /// response (payment marked failed, no URL) but does not fail the
    /// order, which stays `pending`.
    async fn create_payos_payment(
        &self,
        order: &OrderModel,
        items: &[OrderItemModel],
    ) -> Result<(Option<String>, String), ServiceError> {
        use rust_decimal::prelude::ToPrimitive;

        let payos_order_code = payos::generate_order_code();
        let now = Utc::now();

        let payment_record = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            method: Set(PaymentMethod::Payos),
            status: Set(PaymentStatus::Pending),
            amount: Set(order.final_amount),
            transaction_code: Set(None),
            payos_order_code: Set(Some(payos_order_code)),
            payos_payment_link_id: Set(None),
            verified_by: Set(None),
            notes: Set(None),
            payment_date: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        let link_request = CreatePaymentLinkRequest {
            order_code: payos_order_code,
            amount: order.final_amount,
            description: order.order_code.clone(),
            order_id: Some(order.id),
            buyer_name: order.recipient_name.clone(),
            buyer_phone: order.recipient_phone.clone(),
            buyer_address: Some(order.shipping_address.clone()),
            items: items
                .iter()
                .map(|i| PaymentItem {
                    name: format!("Product {}", i.product_id),
                    quantity: i.quantity,
                    price: i.price_at_purchase.trunc().to_i64().unwrap_or_default(),
                })
                .collect(),
        };

        let result = self.gateway.create_payment_link(link_request).await;
        if result.is_ok() {
            if let Some(data) = result.data {
                let mut model: payment::ActiveModel = payment_record.into();
                model.payos_payment_link_id = Set(Some(data.payment_link_id.clone()));
                model.transaction_code = Set(Some(data.payment_link_id));
                model.updated_at = Set(Utc::now());
                model.update(&*self.db).await?;

                info!(order_id = %order.id, "PayOS payment link created");
                return Ok((
                    Some(data.checkout_url),
                    "Order created. Complete payment via the PayOS checkout link.".to_string(),
                ));
            }
        }

        error!(order_id = %order.id, message = %result.message, "PayOS payment link creation failed");
        let payment_id = payment_record.id;
        let mut model: payment::ActiveModel = payment_record.into();
        model.status = Set(PaymentStatus::Failed);
        model.notes = Set(Some(result.message.clone()));
        model.updated_at = Set(Utc::now());
        model.update(&*self.db).await?;

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentFailed {
                order_id: order.id,
                payment_id,
            })
            .await
        {
            warn!(order_id = %order.id, error = %e, "Failed to send payment failed event");
        }

        Ok((
            None,
            format!("Order created but the payment link could not be issued: {}", result.message),
        ))
    }

    /// Resolves an identifier that may be a uuid or an order code.
    pub async fn get_order(&self, id_or_code: &str) -> Result<OrderModel, ServiceError> {
        let order = if let Ok(id) = Uuid::parse_str(id_or_code) {
            Order::find_by_id(id).one(&*self.db).await?
        } else {
            Order::find()
                .filter(order::Column::OrderCode.eq(id_or_code))
                .one(&*self.db)
                .await?
        };

        order.ok_or_else(|| ServiceError::NotFound(format!("Order {id_or_code} not found")))
    }

    pub async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItemModel>, ServiceError> {
        Ok(OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }

    /// Newest-first payment history for an order.
    pub async fn payments_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<PaymentModel>, ServiceError> {
        Ok(Payment::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .order_by_desc(payment::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn active_payment(&self, order_id: Uuid) -> Result<Option<PaymentModel>, ServiceError> {
        Ok(Payment::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .order_by_desc(payment::Column::CreatedAt)
            .one(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self, query: ListOrdersQuery) -> Result<OrderListResponse, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);

        let mut finder = Order::find();
        if let Some(status) = query.status {
            finder = finder.filter(order::Column::Status.eq(status));
        }
        if let Some(customer_id) = query.customer_id {
            finder = finder.filter(order::Column::CustomerId.eq(customer_id));
        }
        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{search}%");
            finder = finder.filter(
                Condition::any()
                    .add(order::Column::OrderCode.like(pattern.clone()))
                    .add(order::Column::RecipientName.like(pattern.clone()))
                    .add(order::Column::RecipientPhone.like(pattern)),
            );
        }
        if let Some(start) = query.start_date {
            finder = finder.filter(order::Column::CreatedAt.gte(start));
        }
        if let Some(end) = query.end_date {
            finder = finder.filter(order::Column::CreatedAt.lte(end));
        }

        let paginator = finder
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        Ok(OrderListResponse {
            orders,
            total,
            page,
            limit,
        })
    }

    /// Asynchronous gateway confirmation. Signature failures reject the
    /// payload before any mutation; unknown order codes are logged no-ops
    /// so the gateway does not retry forever.
    #[instrument(skip(self, webhook))]
    pub async fn handle_webhook(&self, webhook: PayOsWebhook) -> Result<(), ServiceError> {
        if !self.gateway.verify_webhook(&webhook) {
            warn!("PayOS webhook signature verification failed");
            return Err(ServiceError::BadRequest(
                "Invalid webhook signature".to_string(),
            ));
        }

        let data = webhook
            .transaction()
            .map_err(|e| ServiceError::BadRequest(format!("Malformed webhook data: {e}")))?;

        let Some(payment_record) = Payment::find()
            .filter(payment::Column::PayosOrderCode.eq(data.order_code))
            .one(&*self.db)
            .await?
        else {
            warn!(order_code = data.order_code, "No payment for webhook order code");
            return Ok(());
        };

        let Some(order_record) = Order::find_by_id(payment_record.order_id).one(&*self.db).await?
        else {
            warn!(payment_id = %payment_record.id, "No order for webhook payment");
            return Ok(());
        };

        if data.code == "00" {
            if payment_record.status == PaymentStatus::Completed {
                info!(order_id = %order_record.id, "Duplicate success webhook ignored");
                return Ok(());
            }

            let customer_id = order_record.customer_id;
            let order_id = order_record.id;

            let txn = self.db.begin().await?;
            let mut pay: payment::ActiveModel = payment_record.into();
            pay.status = Set(PaymentStatus::Completed);
            pay.notes = Set(Some("PayOS payment successful".to_string()));
            pay.payment_date = Set(Utc::now());
            pay.updated_at = Set(Utc::now());
            pay.update(&txn).await?;

            if order_record.status.can_transition_to(OrderStatus::Confirmed) {
                let mut ord: order::ActiveModel = order_record.into();
                ord.status = Set(OrderStatus::Confirmed);
                ord.updated_at = Set(Utc::now());
                ord.update(&txn).await?;
            }
            txn.commit().await?;

            info!(order_id = %order_id, "Payment confirmed via webhook");

            // Cart clearing runs off the request path; its failure cannot
            // affect the webhook outcome.
            if let Err(e) = self
                .event_sender
                .send(Event::OrderConfirmed {
                    order_id,
                    customer_id,
                })
                .await
            {
                warn!(order_id = %order_id, error = %e, "Failed to send order confirmed event");
            }
        } else {
            // A stale failure arriving after a success must not regress a
            // completed payment.
            if payment_record.status == PaymentStatus::Completed {
                warn!(
                    order_id = %order_record.id,
                    code = %data.code,
                    "Stale failure webhook after completed payment ignored"
                );
                return Ok(());
            }

            let order_id = order_record.id;
            let payment_id = payment_record.id;

            let txn = self.db.begin().await?;
            let mut pay: payment::ActiveModel = payment_record.into();
            pay.status = Set(PaymentStatus::Failed);
            pay.notes = Set(Some(if data.desc.is_empty() {
                "PayOS payment failed".to_string()
            } else {
                data.desc.clone()
            }));
            pay.updated_at = Set(Utc::now());
            pay.update(&txn).await?;

            if order_record.status.can_transition_to(OrderStatus::Failed) {
                let mut ord: order::ActiveModel = order_record.into();
                ord.status = Set(OrderStatus::Failed);
                ord.updated_at = Set(Utc::now());
                ord.update(&txn).await?;
            }
            txn.commit().await?;

            warn!(order_id = %order_id, code = %data.code, "Payment failed via webhook");

            if let Err(e) = self
                .event_sender
                .send(Event::PaymentFailed {
                    order_id,
                    payment_id,
                })
                .await
            {
                warn!(order_id = %order_id, error = %e, "Failed to send payment failed event");
            }
        }

        Ok(())
    }

    /// Client-side fallback for a delayed webhook. Idempotent on repeat
    /// calls after success; does not clear the cart (only the webhook
    /// path does).
    #[instrument(skip(self, request), fields(order = %request.order_id))]
    pub async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<ConfirmPaymentResponse, ServiceError> {
        request.validate()?;
        let order_record = self.get_order(&request.order_id).await?;

        if order_record.status == OrderStatus::Success {
            let payment_record = self.active_payment(order_record.id).await?;
            return Ok(ConfirmPaymentResponse {
                order: order_record,
                payment: payment_record,
                message: "Order payment was already confirmed".to_string(),
            });
        }

        if order_record.status == OrderStatus::Failed {
            return Err(ServiceError::Conflict(
                "Cannot confirm payment for a cancelled order".to_string(),
            ));
        }

        let payment_record = self
            .active_payment(order_record.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment record not found".to_string()))?;

        if payment_record.method != PaymentMethod::Payos {
            return Err(ServiceError::BadRequest(
                "Only PayOS payments can be confirmed".to_string(),
            ));
        }

        if payment_record.status == PaymentStatus::Completed {
            info!(order_id = %order_record.id, "Payment already completed, confirmation is a no-op");
            return Ok(ConfirmPaymentResponse {
                order: order_record,
                payment: Some(payment_record),
                message: "Payment was already confirmed".to_string(),
            });
        }

        if matches!(
            payment_record.status,
            PaymentStatus::Failed | PaymentStatus::Cancelled
        ) {
            return Err(ServiceError::Conflict(
                "Cannot confirm a failed or cancelled payment".to_string(),
            ));
        }

        // Best-effort cross-check with the gateway; a lookup failure does
        // not block the client-reported confirmation.
        if let Some(order_code) = payment_record.payos_order_code {
            let result = self.gateway.get_payment_link(order_code).await;
            if result.is_ok() {
                info!(order_code, "PayOS cross-check succeeded");
            } else {
                warn!(order_code, message = %result.message, "PayOS cross-check failed, proceeding");
            }
        }

        let order_id = order_record.id;
        let txn = self.db.begin().await?;

        let mut pay: payment::ActiveModel = payment_record.into();
        pay.status = Set(PaymentStatus::Completed);
        pay.notes = Set(Some(
            request
                .notes
                .unwrap_or_else(|| "Payment confirmed from storefront callback".to_string()),
        ));
        if let Some(transaction_id) = request.transaction_id {
            pay.transaction_code = Set(Some(transaction_id));
        }
        pay.payment_date = Set(Utc::now());
        pay.updated_at = Set(Utc::now());
        let updated_payment = pay.update(&txn).await?;

        let updated_order = if order_record.status.can_transition_to(OrderStatus::Confirmed) {
            let mut ord: order::ActiveModel = order_record.into();
            ord.status = Set(OrderStatus::Confirmed);
            ord.updated_at = Set(Utc::now());
            ord.update(&txn).await?
        } else {
            order_record
        };

        txn.commit().await?;
        info!(order_id = %order_id, "Payment confirmed via storefront callback");

        Ok(ConfirmPaymentResponse {
            order: updated_order,
            payment: Some(updated_payment),
            message: "Payment confirmed successfully".to_string(),
        })
    }

    /// Cancels an order. Idempotent on already-failed orders; rejects
    /// completed ones.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let order_record = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        if order_record.status == OrderStatus::Success {
            return Err(ServiceError::Conflict(
                "Cannot cancel a completed order".to_string(),
            ));
        }

        if order_record.status == OrderStatus::Failed {
            info!(order_id = %order_id, "Order already cancelled, returning as-is");
            return Ok(order_record);
        }

        let reason_text = reason.unwrap_or_else(|| "Order cancelled".to_string());

        let payment_record = self.active_payment(order_id).await?;
        if let Some(pay_record) = payment_record {
            let cancellable = pay_record.method == PaymentMethod::Payos
                && pay_record.status != PaymentStatus::Cancelled;
            if cancellable {
                if let Some(order_code) = pay_record.payos_order_code {
                    let result = self
                        .gateway
                        .cancel_payment_link(order_code, Some(reason_text.clone()))
                        .await;
                    if !result.is_ok() {
                        warn!(order_code, message = %result.message, "PayOS link cancellation failed");
                    }
                }
                let mut pay: payment::ActiveModel = pay_record.into();
                pay.status = Set(PaymentStatus::Cancelled);
                pay.notes = Set(Some(reason_text.clone()));
                pay.updated_at = Set(Utc::now());
                pay.update(&*self.db).await?;
            }
        }

        let mut ord: order::ActiveModel = order_record.into();
        ord.status = Set(OrderStatus::Failed);
        ord.notes = Set(Some(reason_text));
        ord.updated_at = Set(Utc::now());
        let updated = ord.update(&*self.db).await?;

        info!(order_id = %order_id, "Order cancelled");
        if let Err(e) = self.event_sender.send(Event::OrderCancelled(order_id)).await {
            warn!(order_id = %order_id, error = %e, "Failed to send order cancelled event");
        }

        Ok(updated)
    }

    /// Audited administrative override. Separate from domain transitions;
    /// still refuses to leave terminal states.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn override_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        admin_id: Uuid,
        notes: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let order_record = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        if order_record.status == new_status {
            return Ok(order_record);
        }

        if order_record.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "Order is already {} and cannot change status",
                order_record.status
            )));
        }

        let old_status = order_record.status;
        let mut ord: order::ActiveModel = order_record.into();
        ord.status = Set(new_status);
        ord.processed_by = Set(Some(admin_id));
        if let Some(notes) = notes {
            ord.notes = Set(Some(notes));
        }
        ord.updated_at = Set(Utc::now());
        let updated = ord.update(&*self.db).await?;

        info!(
            order_id = %order_id,
            admin_id = %admin_id,
            old_status = %old_status,
            new_status = %new_status,
            "Order status overridden"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusOverridden {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to send status override event");
        }

        Ok(updated)
    }
}

/// Human-readable order code, `ORD-YYYYMMDD-XXXXXX`. The suffix is
/// random so codes minted in the same instant cannot collide on the
/// unique index.
fn generate_order_code(now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}
