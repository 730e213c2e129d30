mod common;

use axum::http::{Method, StatusCode};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

use atelier_api::entities::{
    order::{Entity as OrderEntity, OrderStatus},
    payment::{Column as PaymentColumn, Entity as PaymentEntity, PaymentStatus},
};
use common::{order_payload, webhook_payload, TestApp};

async fn create_order(app: &TestApp, method: &str) -> (Uuid, String) {
    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(Uuid::new_v4(), method, None)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = Uuid::parse_str(body["data"]["order"]["id"].as_str().unwrap()).unwrap();
    let code = body["data"]["order"]["order_code"]
        .as_str()
        .unwrap()
        .to_string();
    (id, code)
}

async fn payos_order_code(app: &TestApp, order_id: Uuid) -> i64 {
    PaymentEntity::find()
        .filter(PaymentColumn::OrderId.eq(order_id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .payos_order_code
        .unwrap()
}

#[tokio::test]
async fn cancel_pending_payos_order_cancels_payment_link() {
    let app = TestApp::new().await;
    let (order_id, _) = create_order(&app, "payos").await;

    let (status, body) = app
        .request_json(
            Method::PATCH,
            &format!("/api/v1/orders/{order_id}/cancel"),
            Some(json!({"reason": "changed my mind"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "failed");
    assert_eq!(body["data"]["notes"], "changed my mind");

    let payment = PaymentEntity::find()
        .filter(PaymentColumn::OrderId.eq(order_id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Cancelled);
    assert_eq!(app.gateway.cancel_call_count(), 1);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let app = TestApp::new().await;
    let (order_id, _) = create_order(&app, "cash").await;

    for _ in 0..2 {
        let (status, body) = app
            .request_json(
                Method::PATCH,
                &format!("/api/v1/orders/{order_id}/cancel"),
                Some(json!({"reason": "duplicate click"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "failed");
    }
}

#[tokio::test]
async fn completed_order_cannot_be_cancelled() {
    let app = TestApp::new().await;
    let (order_id, _) = create_order(&app, "payos").await;
    let payos_code = payos_order_code(&app, order_id).await;

    // Walk the order to its terminal success state.
    app.request_json(
        Method::POST,
        "/api/v1/orders/payos/webhook",
        Some(webhook_payload(payos_code, "00", "success")),
    )
    .await;
    let admin_id = Uuid::new_v4();
    for next in ["shipping", "success"] {
        let (status, _) = app
            .request_json(
                Method::PATCH,
                &format!("/api/v1/orders/{order_id}/status"),
                Some(json!({"status": next, "admin_id": admin_id})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app
        .request_json(
            Method::PATCH,
            &format!("/api/v1/orders/{order_id}/cancel"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn confirm_payment_fallback_confirms_without_clearing_cart() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    app.seed_cart_with_item(customer_id).await;

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(customer_id, "payos", None)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = Uuid::parse_str(body["data"]["order"]["id"].as_str().unwrap()).unwrap();

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/confirm-payment",
            Some(json!({"order_id": order_id, "transaction_id": "FT999"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["status"], "confirmed");
    assert_eq!(body["data"]["payment"]["status"], "completed");
    assert_eq!(body["data"]["payment"]["transaction_code"], "FT999");

    // The fallback path deliberately leaves the cart alone; only the
    // webhook clears it.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let cart = app.state.services.carts.get_cart(customer_id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(app.order_confirmed_event_count(), 0);
}

#[tokio::test]
async fn confirm_payment_is_idempotent_and_accepts_order_code() {
    let app = TestApp::new().await;
    let (_, order_code) = create_order(&app, "payos").await;

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/confirm-payment",
            Some(json!({"order_id": order_code})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/confirm-payment",
            Some(json!({"order_id": order_code})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Payment was already confirmed");
}

#[tokio::test]
async fn confirm_payment_rejects_cash_and_cancelled_orders() {
    let app = TestApp::new().await;

    let (cash_order, _) = create_order(&app, "cash").await;
    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/confirm-payment",
            Some(json!({"order_id": cash_order})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (cancelled_order, _) = create_order(&app, "payos").await;
    app.request_json(
        Method::PATCH,
        &format!("/api/v1/orders/{cancelled_order}/cancel"),
        None,
    )
    .await;
    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/confirm-payment",
            Some(json!({"order_id": cancelled_order})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn status_override_is_audited_and_respects_terminal_states() {
    let app = TestApp::new().await;
    let (order_id, _) = create_order(&app, "cash").await;
    let admin_id = Uuid::new_v4();

    let (status, body) = app
        .request_json(
            Method::PATCH,
            &format!("/api/v1/orders/{order_id}/status"),
            Some(json!({
                "status": "confirmed",
                "admin_id": admin_id,
                "notes": "verified by phone",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");
    assert_eq!(body["data"]["processed_by"].as_str().unwrap(), admin_id.to_string());
    assert_eq!(body["data"]["notes"], "verified by phone");

    for next in ["shipping", "success"] {
        let (status, _) = app
            .request_json(
                Method::PATCH,
                &format!("/api/v1/orders/{order_id}/status"),
                Some(json!({"status": next, "admin_id": admin_id})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let stored = OrderEntity::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Success);

    // Success is terminal.
    let (status, _) = app
        .request_json(
            Method::PATCH,
            &format!("/api/v1/orders/{order_id}/status"),
            Some(json!({"status": "pending", "admin_id": admin_id})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn payment_history_is_exposed_per_order() {
    let app = TestApp::new().await;
    let (order_id, code) = create_order(&app, "payos").await;

    let (status, body) = app
        .request_json(Method::GET, &format!("/api/v1/orders/{code}/payments"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let payments = body["data"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(
        payments[0]["order_id"].as_str().unwrap(),
        order_id.to_string()
    );
    assert_eq!(payments[0]["method"], "payos");
}
