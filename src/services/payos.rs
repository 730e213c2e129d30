use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PayOsConfig;

type HmacSha256 = Hmac<Sha256>;

const PAYOS_SUCCESS_CODE: &str = "00";

/// Uniform gateway result. `error == 0` means success; failures are folded
/// into this shape instead of being raised, so callers branch on `error`
/// and decide how to degrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayOsResult<T> {
    pub error: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T> PayOsResult<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            error: 0,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            error: 1,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error == 0
    }
}

/// Input for creating a hosted-checkout link.
#[derive(Debug, Clone)]
pub struct CreatePaymentLinkRequest {
    /// Numeric code identifying the payment at the gateway
    pub order_code: i64,
    /// Amount in VND; PayOS accepts whole numbers only
    pub amount: Decimal,
    pub description: String,
    /// Internal order id, carried into the callback URLs
    pub order_id: Option<Uuid>,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_address: Option<String>,
    pub items: Vec<PaymentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentItem {
    pub name: String,
    pub quantity: i32,
    pub price: i64,
}

/// Checkout link details returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutData {
    pub order_code: i64,
    pub amount: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub currency: String,
    pub payment_link_id: String,
    #[serde(default)]
    pub status: String,
    pub checkout_url: String,
    #[serde(default)]
    pub qr_code: String,
}

/// Payment-link state as reported by the gateway query/cancel endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkInfo {
    pub id: String,
    pub order_code: i64,
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_remaining: i64,
    pub status: String,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

/// Webhook payload: `{code, desc, data, signature}` where `signature` is
/// an HMAC-SHA256 over the flattened `data` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayOsWebhook {
    pub code: String,
    pub desc: String,
    pub data: Value,
    pub signature: String,
}

/// Transaction fields carried in the webhook `data` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayOsWebhookData {
    pub order_code: i64,
    pub amount: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub transaction_date_time: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub payment_link_id: String,
    pub code: String,
    #[serde(default)]
    pub desc: String,
}

impl PayOsWebhook {
    /// `true` when the embedded transaction code reports success.
    pub fn is_success(&self) -> bool {
        self.code == PAYOS_SUCCESS_CODE
    }

    pub fn transaction(&self) -> Result<PayOsWebhookData, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Strategy seam over the hosted-checkout gateway so the order
/// orchestrator can be exercised against a scripted fake in tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_link(&self, req: CreatePaymentLinkRequest) -> PayOsResult<CheckoutData>;

    async fn get_payment_link(&self, order_code: i64) -> PayOsResult<PaymentLinkInfo>;

    async fn cancel_payment_link(
        &self,
        order_code: i64,
        reason: Option<String>,
    ) -> PayOsResult<PaymentLinkInfo>;

    fn verify_webhook(&self, webhook: &PayOsWebhook) -> bool;
}

/// Generates a numeric gateway order code: a random 10-digit integer.
pub fn generate_order_code() -> i64 {
    rand::thread_rng().gen_range(1_000_000_000..=9_999_999_999)
}

/// Formats a VND amount with thousands separators, e.g. `1.000.000 ₫`.
pub fn format_vnd(amount: Decimal) -> String {
    let whole = amount.trunc().to_string();
    let (sign, digits) = match whole.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", whole.as_str()),
    };
    let mut grouped = String::new();
    let bytes = digits.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*b as char);
    }
    format!("{sign}{grouped} \u{20ab}")
}

/// Flattens a JSON object into the canonical `key=value&...` form PayOS
/// signs: keys sorted lexicographically, nulls rendered empty, nested
/// values rendered as compact JSON.
fn signature_payload(data: &Value) -> String {
    let Some(map) = data.as_object() else {
        return String::new();
    };
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys.iter()
        .map(|k| {
            let rendered = match &map[k.as_str()] {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{k}={rendered}")
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac_hex(key: &str, payload: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("hmac key");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    code: String,
    desc: String,
    data: Option<T>,
}

/// PayOS REST client. Credentials and the storefront base URL are injected
/// through config; nothing is read from ambient state.
pub struct PayOsClient {
    http: reqwest::Client,
    config: PayOsConfig,
    frontend_url: String,
}

impl PayOsClient {
    pub fn new(config: PayOsConfig, frontend_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            frontend_url,
        }
    }

    /// Builds the storefront callback URL carrying orderId/orderCode for
    /// the client-side confirmation fallback.
    fn callback_url(&self, kind: &str, order_id: Option<Uuid>, order_code: i64) -> String {
        let base = self.frontend_url.trim_end_matches('/');
        let mut url = format!("{base}/payment/{kind}?orderCode={order_code}");
        if let Some(id) = order_id {
            url.push_str(&format!("&orderId={id}"));
        }
        url
    }

    /// Request signature over the canonical field string, per the PayOS
    /// checksum scheme.
    fn request_signature(
        &self,
        amount: i64,
        cancel_url: &str,
        description: &str,
        order_code: i64,
        return_url: &str,
    ) -> String {
        let payload = format!(
            "amount={amount}&cancelUrl={cancel_url}&description={description}&orderCode={order_code}&returnUrl={return_url}"
        );
        hmac_hex(&self.config.checksum_key, &payload)
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiEnvelope<T>, reqwest::Error> {
        self.http
            .post(format!("{}{}", self.config.api_base_url, path))
            .header("x-client-id", &self.config.client_id)
            .header("x-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?
            .json::<ApiEnvelope<T>>()
            .await
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<ApiEnvelope<T>, reqwest::Error> {
        self.http
            .get(format!("{}{}", self.config.api_base_url, path))
            .header("x-client-id", &self.config.client_id)
            .header("x-api-key", &self.config.api_key)
            .send()
            .await?
            .json::<ApiEnvelope<T>>()
            .await
    }

    fn envelope_to_result<T>(envelope: ApiEnvelope<T>) -> PayOsResult<T> {
        if envelope.code == PAYOS_SUCCESS_CODE {
            match envelope.data {
                Some(data) => PayOsResult::ok("Success", data),
                None => PayOsResult::err("Gateway returned success with no data"),
            }
        } else {
            PayOsResult::err(envelope.desc)
        }
    }
}

#[async_trait]
impl PaymentGateway for PayOsClient {
    async fn create_payment_link(&self, req: CreatePaymentLinkRequest) -> PayOsResult<CheckoutData> {
        use rust_decimal::prelude::ToPrimitive;

        let Some(amount) = req.amount.trunc().to_i64() else {
            return PayOsResult::err(format!("Amount {} is not representable", req.amount));
        };

        let return_url = self.callback_url("success", req.order_id, req.order_code);
        let cancel_url = self.callback_url("cancel", req.order_id, req.order_code);
        let signature =
            self.request_signature(amount, &cancel_url, &req.description, req.order_code, &return_url);

        info!(
            order_code = req.order_code,
            amount, "Creating PayOS payment link"
        );

        let items = if req.items.is_empty() {
            vec![PaymentItem {
                name: req.description.clone(),
                quantity: 1,
                price: amount,
            }]
        } else {
            req.items
        };

        let body = serde_json::json!({
            "orderCode": req.order_code,
            "amount": amount,
            "description": req.description,
            "returnUrl": return_url,
            "cancelUrl": cancel_url,
            "signature": signature,
            "items": items,
            "buyerName": req.buyer_name,
            "buyerPhone": req.buyer_phone,
            "buyerAddress": req.buyer_address,
        });

        match self.post_json("/v2/payment-requests", &body).await {
            Ok(envelope) => Self::envelope_to_result(envelope),
            Err(e) => {
                error!(order_code = req.order_code, error = %e, "PayOS payment link creation failed");
                PayOsResult::err(format!("Failed to create payment link: {e}"))
            }
        }
    }

    async fn get_payment_link(&self, order_code: i64) -> PayOsResult<PaymentLinkInfo> {
        match self
            .get_json(&format!("/v2/payment-requests/{order_code}"))
            .await
        {
            Ok(envelope) => Self::envelope_to_result(envelope),
            Err(e) => {
                error!(order_code, error = %e, "PayOS payment link lookup failed");
                PayOsResult::err(format!("Failed to get payment link: {e}"))
            }
        }
    }

    async fn cancel_payment_link(
        &self,
        order_code: i64,
        reason: Option<String>,
    ) -> PayOsResult<PaymentLinkInfo> {
        let body = serde_json::json!({ "cancellationReason": reason });
        match self
            .post_json(&format!("/v2/payment-requests/{order_code}/cancel"), &body)
            .await
        {
            Ok(envelope) => Self::envelope_to_result(envelope),
            Err(e) => {
                error!(order_code, error = %e, "PayOS payment link cancellation failed");
                PayOsResult::err(format!("Failed to cancel payment link: {e}"))
            }
        }
    }

    fn verify_webhook(&self, webhook: &PayOsWebhook) -> bool {
        if webhook.signature.is_empty() || !webhook.data.is_object() {
            warn!("PayOS webhook missing signature or data");
            return false;
        }
        let expected = hmac_hex(&self.config.checksum_key, &signature_payload(&webhook.data));
        constant_time_eq(&expected, &webhook.signature)
    }
}
