// src/backend/adapter/stripe_adapter.rs
// Stripe REST client over HTTPS outcalls, and the processor seam the
// signing and void flows are written against.

use crate::models::{to_cents, ContractId, Dollars, PaymentId};
use crate::storage::config::ServiceConfig;
use crate::utils::log::{log_error, log_info};
use ic_cdk::api::management_canister::http_request::{
    http_request, CanisterHttpRequestArgument, HttpHeader, HttpMethod, TransformContext,
};
use num::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use url::form_urlencoded;

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";
const MAX_RESPONSE_BYTES: u64 = 1024 * 64; // Max 64KiB response
pub const TRANSFORM_FUNCTION: &str = "transform_outcall";

/// Failure reported by the processor, or by the transport in front of it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProcessorError {
    pub code: Option<String>,
    pub message: String,
    pub status: Option<u16>,
}

impl ProcessorError {
    pub fn new(code: Option<&str>, message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
            status,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message, None)
    }

    pub fn is_already_refunded(&self) -> bool {
        self.code.as_deref() == Some("charge_already_refunded")
    }

    pub fn is_insufficient_funds(&self) -> bool {
        self.code.as_deref() == Some("insufficient_funds")
            || self.message.to_ascii_lowercase().contains("insufficient")
    }
}

/// A Stripe field that is either an id or the expanded object.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl<T: HasId> Expandable<T> {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(obj) => obj.id(),
        }
    }
}

pub trait HasId {
    fn id(&self) -> &str;
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<Expandable<PaymentIntent>>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<u64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub latest_charge: Option<Expandable<Charge>>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Charge {
    pub id: String,
    #[serde(default)]
    pub refunded: bool,
    #[serde(default)]
    pub amount_refunded: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Refund {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: u64,
}

impl HasId for PaymentIntent {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for Charge {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    pub contract_id: ContractId,
    pub payment_id: PaymentId,
    pub amount: Dollars,
    pub description: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefundRequest {
    pub payment_intent_id: String,
    pub amount_cents: u64,
    pub metadata: Vec<(String, String)>,
    pub idempotency_key: String,
}

/// Operations the signing and void flows need from the payment processor.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError>;

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ProcessorError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProcessorError>;

    async fn retrieve_charge(&self, id: &str) -> Result<Charge, ProcessorError>;

    async fn create_refund(&self, request: &RefundRequest) -> Result<Refund, ProcessorError>;
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Maps a non-2xx Stripe response to a `ProcessorError`.
pub fn parse_error_response(status: u16, body: &[u8]) -> ProcessorError {
    match serde_json::from_slice::<StripeErrorBody>(body) {
        Ok(parsed) => ProcessorError {
            code: parsed.error.code,
            message: parsed
                .error
                .message
                .unwrap_or_else(|| format!("Stripe returned status {}", status)),
            status: Some(status),
        },
        Err(_) => ProcessorError::new(
            None,
            format!(
                "Stripe returned status {}: {}",
                status,
                String::from_utf8_lossy(body)
            ),
            Some(status),
        ),
    }
}

pub fn checkout_session_form(
    request: &CheckoutSessionRequest,
    currency: &str,
) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            currency.to_string(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            to_cents(request.amount).to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.description.clone(),
        ),
        ("metadata[contract_id]".to_string(), request.contract_id.clone()),
        ("metadata[payment_id]".to_string(), request.payment_id.clone()),
        (
            "payment_intent_data[metadata][contract_id]".to_string(),
            request.contract_id.clone(),
        ),
        (
            "payment_intent_data[metadata][payment_id]".to_string(),
            request.payment_id.clone(),
        ),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    form
}

pub fn refund_form(request: &RefundRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("payment_intent".to_string(), request.payment_intent_id.clone()),
        ("amount".to_string(), request.amount_cents.to_string()),
    ];
    form.extend(
        request
            .metadata
            .iter()
            .map(|(k, v)| (format!("metadata[{}]", k), v.clone())),
    );
    form
}

fn encode_form(fields: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Live client. Each call is one HTTPS outcall paid with `outcall_cycles`.
pub struct StripeClient {
    secret_key: String,
    currency: String,
    cycles: u128,
}

impl StripeClient {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            secret_key: config.stripe_secret_key.clone(),
            currency: config.currency.clone(),
            cycles: config.outcall_cycles,
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        method: HttpMethod,
        path: &str,
        form: Option<&[(String, String)]>,
        idempotency_key: Option<&str>,
    ) -> Result<T, ProcessorError> {
        if self.secret_key.is_empty() {
            return Err(ProcessorError::transport("Stripe secret key is not configured"));
        }

        let mut headers = vec![HttpHeader {
            name: "Authorization".to_string(),
            value: format!("Bearer {}", self.secret_key),
        }];
        if form.is_some() {
            headers.push(HttpHeader {
                name: "Content-Type".to_string(),
                value: "application/x-www-form-urlencoded".to_string(),
            });
        }
        if let Some(key) = idempotency_key {
            headers.push(HttpHeader {
                name: "Idempotency-Key".to_string(),
                value: key.to_string(),
            });
        }

        let request_arg = CanisterHttpRequestArgument {
            url: format!("{}{}", STRIPE_API_URL, path),
            method,
            body: form.map(|fields| encode_form(fields).into_bytes()),
            max_response_bytes: Some(MAX_RESPONSE_BYTES),
            transform: Some(TransformContext::from_name(
                TRANSFORM_FUNCTION.to_string(),
                vec![],
            )),
            headers,
        };

        match http_request(request_arg, self.cycles).await {
            Ok((response,)) => {
                let status = response.status.0.to_u16().unwrap_or(500);
                log_info!("💳 Stripe {} responded with status {}", path, status);
                if (200..300).contains(&status) {
                    serde_json::from_slice::<T>(&response.body).map_err(|e| {
                        ProcessorError::transport(format!(
                            "Failed to deserialize Stripe response: {}",
                            e
                        ))
                    })
                } else {
                    Err(parse_error_response(status, &response.body))
                }
            }
            Err((code, msg)) => {
                log_error!("HTTP outcall to Stripe failed: {:?} - {}", code, msg);
                Err(ProcessorError::transport(format!(
                    "Failed to call Stripe {}: {:?} - {}",
                    path, code, msg
                )))
            }
        }
    }
}

impl PaymentProcessor for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError> {
        let form = checkout_session_form(request, &self.currency);
        let key = format!("checkout-{}", request.payment_id);
        self.send(HttpMethod::POST, "/checkout/sessions", Some(&form), Some(&key))
            .await
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ProcessorError> {
        self.send(HttpMethod::GET, &format!("/checkout/sessions/{}", id), None, None)
            .await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProcessorError> {
        self.send(HttpMethod::GET, &format!("/payment_intents/{}", id), None, None)
            .await
    }

    async fn retrieve_charge(&self, id: &str) -> Result<Charge, ProcessorError> {
        self.send(HttpMethod::GET, &format!("/charges/{}", id), None, None)
            .await
    }

    async fn create_refund(&self, request: &RefundRequest) -> Result<Refund, ProcessorError> {
        let form = refund_form(request);
        self.send(
            HttpMethod::POST,
            "/refunds",
            Some(&form),
            Some(&request.idempotency_key),
        )
        .await
    }
}
