// src/backend/http.rs
// HTTP gateway surface: request/response types, routing and JSON replies.

use crate::adapter::email_adapter::EmailMessage;
use crate::adapter::stripe_adapter::PaymentProcessor;
use crate::error::ContractError;
use crate::models::TimestampNs;
use crate::services::signing_service::{self, RequestContext};
use crate::services::webhook_service;
use crate::utils::log::log_warn;
use candid::CandidType;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use serde_json::{json, Value};
use url::Url;

pub type HeaderField = (String, String);

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<HeaderField>,
    pub body: ByteBuf,
}

#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: Vec<HeaderField>,
    pub body: ByteBuf,
    pub upgrade: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SignContract(String),
    VoidContract(String),
    StripeWebhook,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Client IP as reported by the boundary node, or `unknown`. Only the
    /// last `X-Forwarded-For` hop is trusted; earlier entries are caller-set.
    pub fn client_ip(&self) -> String {
        self.header("x-forwarded-for")
            .and_then(|v| v.rsplit(',').map(str::trim).find(|hop| !hop.is_empty()))
            .or_else(|| self.header("x-real-ip").map(str::trim))
            .filter(|v| !v.is_empty())
            .unwrap_or("unknown")
            .to_string()
    }

    fn parsed_url(&self) -> Option<Url> {
        Url::parse("https://gateway.local")
            .and_then(|base| base.join(&self.url))
            .ok()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.parsed_url()?
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Matches the path against the gateway routes. Path segments stay
    /// percent-encoded; token decoding happens in the signing guard.
    pub fn route(&self) -> Option<Route> {
        let url = self.parsed_url()?;
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["contracts", "sign", token] => Some(Route::SignContract(token.to_string())),
            ["contracts", id, "void"] => Some(Route::VoidContract(id.to_string())),
            ["webhooks", "stripe"] => Some(Route::StripeWebhook),
            _ => None,
        }
    }
}

pub fn json_response(status_code: u16, body: &Value) -> HttpResponse {
    HttpResponse {
        status_code,
        headers: vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Cache-Control".to_string(), "no-store".to_string()),
        ],
        body: ByteBuf::from(body.to_string().into_bytes()),
        upgrade: None,
    }
}

pub fn error_response(err: &ContractError) -> HttpResponse {
    let mut body = json!({ "message": err.to_string() });
    if err.requires_password() {
        body["requiresPassword"] = json!(true);
    }
    if let ContractError::InvalidInput(detail) = err {
        body["errors"] = json!([detail]);
    }
    json_response(err.status_code(), &body)
}

fn upgrade_response() -> HttpResponse {
    HttpResponse {
        status_code: 200,
        headers: vec![],
        body: ByteBuf::new(),
        upgrade: Some(true),
    }
}

fn not_found() -> HttpResponse {
    json_response(404, &json!({ "message": "Not found" }))
}

fn method_not_allowed() -> HttpResponse {
    json_response(405, &json!({ "message": "Method not allowed" }))
}

/// Query entry point. Known routes are upgraded to an update call.
pub fn handle_query(req: &HttpRequest) -> HttpResponse {
    match req.route() {
        Some(_) => upgrade_response(),
        None => not_found(),
    }
}

/// Update entry point. Returns the reply and any emails to dispatch after it.
pub async fn handle_update<P: PaymentProcessor>(
    processor: &P,
    req: &HttpRequest,
    now: TimestampNs,
) -> (HttpResponse, Vec<EmailMessage>) {
    let Some(route) = req.route() else {
        return (not_found(), vec![]);
    };
    let method = req.method.to_ascii_uppercase();
    let ctx = RequestContext {
        ip_address: req.client_ip(),
        user_agent: req.header("user-agent").map(str::to_string),
    };

    match (method.as_str(), route) {
        ("GET", Route::SignContract(token)) => {
            let password = req.query_param("password");
            match signing_service::view_contract(&token, password.as_deref(), &ctx, now) {
                Ok(view) => (to_json_response(&view), vec![]),
                Err(e) => (error_response(&e), vec![]),
            }
        }
        ("POST", Route::SignContract(token)) => {
            match signing_service::submit_signature(processor, &token, &req.body, &ctx, now).await {
                Ok(outcome) => (to_json_response(&outcome.response), outcome.notifications),
                Err(e) => (error_response(&e), vec![]),
            }
        }
        ("POST", Route::StripeWebhook) => {
            match webhook_service::handle_stripe_webhook(
                &req.body,
                req.header("stripe-signature"),
                now,
            ) {
                Ok(_) => (json_response(200, &json!({ "received": true })), vec![]),
                Err(e) => (error_response(&e), vec![]),
            }
        }
        // Voiding authenticates by caller principal; the gateway is anonymous.
        ("POST", Route::VoidContract(_)) => {
            (error_response(&ContractError::AuthenticationRequired), vec![])
        }
        _ => (method_not_allowed(), vec![]),
    }
}

fn to_json_response<T: Serialize>(value: &T) -> HttpResponse {
    match serde_json::to_value(value) {
        Ok(body) => json_response(200, &body),
        Err(e) => {
            log_warn!("Failed to serialize response: {}", e);
            error_response(&ContractError::InternalError(
                "Failed to serialize response".to_string(),
            ))
        }
    }
}
