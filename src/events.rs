use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::carts::CartService;

/// Domain events emitted by the order flow. Consumers run outside the
/// request path so peripheral side effects cannot fail a core transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    /// Payment verified successfully; downstream consumers (cart clearing)
    /// react to this.
    OrderConfirmed {
        order_id: Uuid,
        customer_id: Uuid,
    },
    OrderCancelled(Uuid),
    PaymentFailed {
        order_id: Uuid,
        payment_id: Uuid,
    },
    OrderStatusOverridden {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event; failure means the processor is gone, which the
    /// caller treats as non-fatal.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }
}

/// Consumes domain events until the channel closes.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, carts: CartService) {
    info!("Event processor started");
    while let Some(event) = rx.recv().await {
        handle_event(&carts, event).await;
    }
    info!("Event processor stopped");
}

/// Reacts to a single event. Side-effect failures are logged, never
/// propagated; the triggering transition has already committed.
pub async fn handle_event(carts: &CartService, event: Event) {
    match event {
        Event::OrderConfirmed {
            order_id,
            customer_id,
        } => {
            if let Err(e) = carts.clear_cart(customer_id).await {
                error!(
                    order_id = %order_id,
                    customer_id = %customer_id,
                    error = %e,
                    "Failed to clear cart after payment confirmation"
                );
            } else {
                info!(
                    order_id = %order_id,
                    customer_id = %customer_id,
                    "Cart cleared after payment confirmation"
                );
            }
        }
        Event::OrderCreated(order_id) => {
            info!(order_id = %order_id, "Order created");
        }
        Event::OrderCancelled(order_id) => {
            info!(order_id = %order_id, "Order cancelled");
        }
        Event::PaymentFailed {
            order_id,
            payment_id,
        } => {
            warn!(order_id = %order_id, payment_id = %payment_id, "Payment failed");
        }
        Event::OrderStatusOverridden {
            order_id,
            old_status,
            new_status,
        } => {
            info!(
                order_id = %order_id,
                old_status = %old_status,
                new_status = %new_status,
                "Order status overridden by administrator"
            );
        }
    }
}
