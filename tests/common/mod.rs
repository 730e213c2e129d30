// Not every test binary uses every helper.
#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use atelier_api::{
    config::{AppConfig, PayOsConfig},
    create_app,
    entities::voucher::{self, DiscountType},
    events::{self, Event, EventSender},
    handlers::AppServices,
    migrator::Migrator,
    services::payos::{
        CheckoutData, CreatePaymentLinkRequest, PayOsResult, PayOsWebhook, PaymentGateway,
        PaymentLinkInfo,
    },
    AppState,
};

/// Scripted stand-in for the hosted-checkout gateway. Records every call
/// so tests can assert on interactions; failure modes are toggled per
/// test.
pub struct FakeGateway {
    pub fail_create: AtomicBool,
    pub reject_webhooks: AtomicBool,
    pub create_calls: Mutex<Vec<CreatePaymentLinkRequest>>,
    pub cancel_calls: Mutex<Vec<i64>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            fail_create: AtomicBool::new(false),
            reject_webhooks: AtomicBool::new(false),
            create_calls: Mutex::new(Vec::new()),
            cancel_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.lock().unwrap().len()
    }

    pub fn cancel_call_count(&self) -> usize {
        self.cancel_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_link(
        &self,
        req: CreatePaymentLinkRequest,
    ) -> PayOsResult<CheckoutData> {
        use rust_decimal::prelude::ToPrimitive;

        let order_code = req.order_code;
        let amount = req.amount.trunc().to_i64().unwrap_or_default();
        self.create_calls.lock().unwrap().push(req);

        if self.fail_create.load(Ordering::SeqCst) {
            return PayOsResult::err("gateway unavailable");
        }

        PayOsResult::ok(
            "success",
            CheckoutData {
                order_code,
                amount,
                description: String::new(),
                currency: "VND".to_string(),
                payment_link_id: format!("plink-{order_code}"),
                status: "PENDING".to_string(),
                checkout_url: format!("https://pay.test/web/{order_code}"),
                qr_code: String::new(),
            },
        )
    }

    async fn get_payment_link(&self, order_code: i64) -> PayOsResult<PaymentLinkInfo> {
        PayOsResult::ok(
            "success",
            PaymentLinkInfo {
                id: format!("plink-{order_code}"),
                order_code,
                amount: 0,
                amount_paid: 0,
                amount_remaining: 0,
                status: "PAID".to_string(),
                cancellation_reason: None,
            },
        )
    }

    async fn cancel_payment_link(
        &self,
        order_code: i64,
        reason: Option<String>,
    ) -> PayOsResult<PaymentLinkInfo> {
        self.cancel_calls.lock().unwrap().push(order_code);
        PayOsResult::ok(
            "success",
            PaymentLinkInfo {
                id: format!("plink-{order_code}"),
                order_code,
                amount: 0,
                amount_paid: 0,
                amount_remaining: 0,
                status: "CANCELLED".to_string(),
                cancellation_reason: reason,
            },
        )
    }

    fn verify_webhook(&self, _webhook: &PayOsWebhook) -> bool {
        !self.reject_webhooks.load(Ordering::SeqCst)
    }
}

/// Application harness backed by an in-memory SQLite database. Emitted
/// lifecycle events are both recorded and fed to the normal side-effect
/// handler, so cart clearing behaves as in production.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub events: Arc<Mutex<Vec<Event>>>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let pool = Database::connect(opts)
            .await
            .expect("failed to open test database");
        Migrator::up(&pool, None)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let cfg = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 18_080,
            environment: "test".to_string(),
            log_level: "warn".to_string(),
            log_json: false,
            auto_migrate: false,
            frontend_url: "http://localhost:3000".to_string(),
            default_shipping_fee: 0,
            payos: PayOsConfig {
                client_id: "test-client".to_string(),
                api_key: "test-key".to_string(),
                checksum_key: "test-checksum".to_string(),
                api_base_url: "https://payos.test".to_string(),
            },
        };

        let (event_tx, mut event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let gateway = Arc::new(FakeGateway::new());

        let services = AppServices::new(
            db_arc.clone(),
            gateway.clone() as Arc<dyn PaymentGateway>,
            event_sender.clone(),
            &cfg,
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_writer = seen.clone();
        let event_carts = services.carts.clone();
        let event_task = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                seen_writer.lock().unwrap().push(event.clone());
                events::handle_event(&event_carts, event).await;
            }
        });

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = create_app(state.clone());

        Self {
            router,
            state,
            gateway,
            events: seen,
            _event_task: event_task,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and decodes the JSON body, returning it with the
    /// status code.
    pub async fn request_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body was not valid json")
        };
        (status, value)
    }

    pub async fn seed_voucher(
        &self,
        code: &str,
        discount_type: DiscountType,
        discount_value: Decimal,
        usage_limit: Option<i32>,
    ) -> voucher::Model {
        let now = Utc::now();
        voucher::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(format!("Test voucher {code}")),
            discount_type: Set(discount_type),
            discount_value: Set(discount_value),
            start_date: Set(now - ChronoDuration::days(1)),
            end_date: Set(now + ChronoDuration::days(30)),
            min_order_value: Set(Decimal::ZERO),
            max_discount_amount: Set(None),
            usage_limit: Set(usage_limit),
            used_count: Set(0),
            is_active: Set(true),
            created_by: Set(None),
            description: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed voucher")
    }

    /// Seeds a cart with one line item for the customer and returns the
    /// customer id.
    pub async fn seed_cart_with_item(&self, customer_id: Uuid) {
        self.state
            .services
            .carts
            .add_item(
                customer_id,
                atelier_api::services::carts::AddItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                    unit_price: Decimal::new(500_000, 0),
                },
            )
            .await
            .expect("failed to seed cart");
    }

    pub fn recorded_events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn order_confirmed_event_count(&self) -> usize {
        self.recorded_events()
            .iter()
            .filter(|e| matches!(e, Event::OrderConfirmed { .. }))
            .count()
    }
}

/// Standard order payload for a single-item order worth 1,000,000 VND.
pub fn order_payload(customer_id: Uuid, payment_method: &str, voucher_code: Option<&str>) -> Value {
    let mut payload = json!({
        "customer_id": customer_id,
        "items": [{
            "product_id": Uuid::new_v4(),
            "quantity": 2,
            "price_at_purchase": "500000",
        }],
        "payment_method": payment_method,
        "shipping_address": "12 Hang Bac, Hoan Kiem, Hanoi",
        "recipient_name": "Linh Tran",
        "recipient_phone": "0912345678",
    });
    if let Some(code) = voucher_code {
        payload["voucher_code"] = json!(code);
    }
    payload
}

/// Webhook payload as PayOS would deliver it; the fake gateway accepts
/// any signature unless told otherwise.
pub fn webhook_payload(payos_order_code: i64, code: &str, desc: &str) -> Value {
    json!({
        "code": code,
        "desc": desc,
        "data": {
            "orderCode": payos_order_code,
            "amount": 1_000_000,
            "description": "test order",
            "reference": "FT123456",
            "transactionDateTime": Utc::now().to_rfc3339(),
            "currency": "VND",
            "paymentLinkId": format!("plink-{payos_order_code}"),
            "code": code,
            "desc": desc,
        },
        "signature": "test-signature",
    })
}

/// Polls a condition until it holds or a short deadline expires.
pub async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
