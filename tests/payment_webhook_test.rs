mod common;

use axum::http::{Method, StatusCode};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use atelier_api::entities::{
    order::{Entity as OrderEntity, Model as OrderModel, OrderStatus},
    payment::{
        Column as PaymentColumn, Entity as PaymentEntity, Model as PaymentModel, PaymentStatus,
    },
};
use common::{order_payload, wait_until, webhook_payload, TestApp};

async fn create_payos_order(app: &TestApp, customer_id: Uuid) -> (OrderModel, PaymentModel) {
    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/orders",
            Some(order_payload(customer_id, "payos", None)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let order_id = Uuid::parse_str(body["data"]["order"]["id"].as_str().unwrap()).unwrap();
    let order = OrderEntity::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    let payment = PaymentEntity::find()
        .filter(PaymentColumn::OrderId.eq(order_id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    (order, payment)
}

async fn cart_is_empty(app: &TestApp, customer_id: Uuid) -> bool {
    let cart = app.state.services.carts.get_cart(customer_id).await.unwrap();
    cart.items.is_empty()
}

#[tokio::test]
async fn success_webhook_confirms_order_and_clears_cart() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    app.seed_cart_with_item(customer_id).await;
    let (order, payment) = create_payos_order(&app, customer_id).await;
    let payos_code = payment.payos_order_code.unwrap();

    let (status, _body) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/payos/webhook",
            Some(webhook_payload(payos_code, "00", "success")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let payment = PaymentEntity::find_by_id(payment.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);

    let order = OrderEntity::find_by_id(order.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);

    assert!(wait_until(|| cart_is_empty(&app, customer_id)).await);
    assert_eq!(app.order_confirmed_event_count(), 1);
}

#[tokio::test]
async fn duplicate_success_webhook_is_idempotent() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    app.seed_cart_with_item(customer_id).await;
    let (order, payment) = create_payos_order(&app, customer_id).await;
    let payos_code = payment.payos_order_code.unwrap();

    for _ in 0..2 {
        let (status, _body) = app
            .request_json(
                Method::POST,
                "/api/v1/orders/payos/webhook",
                Some(webhook_payload(payos_code, "00", "success")),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let order = OrderEntity::find_by_id(order.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);

    assert!(wait_until(|| cart_is_empty(&app, customer_id)).await);
    // The second delivery must not trigger a second cart clear.
    assert_eq!(app.order_confirmed_event_count(), 1);
}

#[tokio::test]
async fn failure_webhook_fails_order_and_payment() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    app.seed_cart_with_item(customer_id).await;
    let (order, payment) = create_payos_order(&app, customer_id).await;
    let payos_code = payment.payos_order_code.unwrap();

    let (status, _body) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/payos/webhook",
            Some(webhook_payload(payos_code, "01", "insufficient funds")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let payment = PaymentEntity::find_by_id(payment.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(payment.notes.as_deref(), Some("insufficient funds"));

    let order = OrderEntity::find_by_id(order.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Failed);

    // A failed payment never clears the cart.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!cart_is_empty(&app, customer_id).await);
    assert_eq!(app.order_confirmed_event_count(), 0);
}

#[tokio::test]
async fn stale_failure_after_success_is_ignored() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    let (order, payment) = create_payos_order(&app, customer_id).await;
    let payos_code = payment.payos_order_code.unwrap();

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/payos/webhook",
            Some(webhook_payload(payos_code, "00", "success")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Late out-of-order failure delivery for the same transaction.
    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/payos/webhook",
            Some(webhook_payload(payos_code, "01", "timeout")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let payment = PaymentEntity::find_by_id(payment.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);

    let order = OrderEntity::find_by_id(order.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    let (order, payment) = create_payos_order(&app, customer_id).await;
    let payos_code = payment.payos_order_code.unwrap();

    app.gateway
        .reject_webhooks
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/payos/webhook",
            Some(webhook_payload(payos_code, "00", "success")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let payment = PaymentEntity::find_by_id(payment.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);

    let order = OrderEntity::find_by_id(order.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn unknown_order_code_is_acknowledged_as_noop() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/orders/payos/webhook",
            Some(webhook_payload(1_234_567_890, "00", "success")),
        )
        .await;

    // 200 so the gateway stops retrying a code we will never know.
    assert_eq!(status, StatusCode::OK);
}
