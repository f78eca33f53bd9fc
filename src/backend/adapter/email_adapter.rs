// src/backend/adapter/email_adapter.rs
// Transactional email over HTTPS outcalls (JSON API).

use crate::error::ContractError;
use crate::storage::config::ServiceConfig;
use crate::utils::log::{log_error, log_info, log_warn};
use ic_cdk::api::management_canister::http_request::{
    http_request, CanisterHttpRequestArgument, HttpHeader, HttpMethod, TransformContext,
};
use num::ToPrimitive;
use serde::Serialize;

use super::stripe_adapter::TRANSFORM_FUNCTION;

const EMAIL_API_URL: &str = "https://api.resend.com/emails";
const MAX_RESPONSE_BYTES: u64 = 1024 * 4;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends one message. A missing API key skips delivery with a warning.
pub async fn send_email(config: &ServiceConfig, message: &EmailMessage) -> Result<(), ContractError> {
    if config.email_api_key.is_empty() {
        log_warn!("Email API key not configured; skipping '{}'", message.subject);
        return Ok(());
    }

    let body = serde_json::to_vec(&EmailPayload {
        from: &config.email_from,
        to: [&message.to],
        subject: &message.subject,
        html: &message.html,
    })
    .map_err(|e| ContractError::InternalError(format!("Failed to serialize email: {}", e)))?;

    let request_arg = CanisterHttpRequestArgument {
        url: EMAIL_API_URL.to_string(),
        method: HttpMethod::POST,
        body: Some(body),
        max_response_bytes: Some(MAX_RESPONSE_BYTES),
        transform: Some(TransformContext::from_name(
            TRANSFORM_FUNCTION.to_string(),
            vec![],
        )),
        headers: vec![
            HttpHeader {
                name: "Content-Type".to_string(),
                value: "application/json".to_string(),
            },
            HttpHeader {
                name: "Authorization".to_string(),
                value: format!("Bearer {}", config.email_api_key),
            },
        ],
    };

    match http_request(request_arg, config.outcall_cycles).await {
        Ok((response,)) => {
            let status = response.status.0.to_u16().unwrap_or(500);
            if (200..300).contains(&status) {
                log_info!("📧 Email '{}' accepted", message.subject);
                Ok(())
            } else {
                Err(ContractError::InternalError(format!(
                    "Email API returned status {}: {}",
                    status,
                    String::from_utf8_lossy(&response.body)
                )))
            }
        }
        Err((code, msg)) => {
            log_error!("HTTP outcall to email API failed: {:?} - {}", code, msg);
            Err(ContractError::InternalError(format!(
                "Failed to call email API: {:?} - {}",
                code, msg
            )))
        }
    }
}
