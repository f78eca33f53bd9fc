// src/backend/services/signing_service.rs
// Public signing-link flow: token verification, the password gate, viewing
// and signature submission.

use crate::adapter::email_adapter::EmailMessage;
use crate::adapter::stripe_adapter::{CheckoutSessionRequest, PaymentProcessor};
use crate::error::ContractError;
use crate::metrics;
use crate::models::{
    ActorType, Client, ClientView, Contract, ContractEventType, ContractStatus, ContractView,
    Payment, PaymentStatus, PaymentType, Signature, TimestampNs,
};
use crate::services::{audit_service, notification_service};
use crate::storage::config::{get_config, ServiceConfig};
use crate::storage::{contracts, ids, parties, payments, signatures};
use crate::utils::crypto::{hash_signing_token, verify_password, verify_signing_token};
use crate::utils::log::{log_error, log_info, log_warn};
use crate::utils::rate_limit::{check_rate_limit, record_attempt, RateLimitPolicy};
use crate::utils::sanitize::{sanitize_full_name, validate_signature_data_url};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

/// Hard ceiling on a submission body, checked before parsing.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Outcome of looking a presented token up by raw value and by keyed hash.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenMatch {
    /// Legacy contract storing the raw token; hash verification is skipped.
    Raw(Contract),
    /// Found through the hash index; `verified` is the constant-time re-check.
    Hash { contract: Contract, verified: bool },
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAction {
    View,
    Submit,
}

/// Caller details taken from the gateway request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestContext {
    pub ip_address: String,
    pub user_agent: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SigningView {
    pub contract: ContractView,
    pub client: Option<ClientView>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub success: bool,
    pub contract: ContractView,
    pub checkout_url: Option<String>,
}

/// A completed submission plus the emails to send once the reply is out.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub response: SignResponse,
    pub notifications: Vec<EmailMessage>,
}

#[derive(Deserialize, Validate, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayload {
    #[validate(length(min = 1, max = 1000))]
    pub full_name: String,
    pub signature_data_url: Option<String>,
    #[validate(length(max = 512))]
    pub user_agent: Option<String>,
    #[validate(length(max = 64))]
    pub ip: Option<String>,
    pub agree: Option<bool>,
}

fn lookup_token(secret: &str, token: &str) -> TokenMatch {
    if let Some(contract) = contracts::find_by_raw_token(token) {
        return TokenMatch::Raw(contract);
    }
    let hash = hash_signing_token(secret, token);
    match contracts::find_by_token_hash(&hash) {
        Some(contract) => {
            let verified = contract
                .signing_token_hash
                .as_deref()
                .is_some_and(|stored| verify_signing_token(secret, token, stored));
            TokenMatch::Hash { contract, verified }
        }
        None => TokenMatch::NoMatch,
    }
}

/// Raw then hashed lookup, retried once on the percent-decoded token.
pub fn resolve_token(secret: &str, token: &str) -> TokenMatch {
    let direct = lookup_token(secret, token);
    if direct != TokenMatch::NoMatch {
        return direct;
    }
    match percent_decode_str(token).decode_utf8() {
        Ok(decoded) if decoded != token => lookup_token(secret, &decoded),
        _ => TokenMatch::NoMatch,
    }
}

/// Turns a lookup result into an authorized contract, or the first rejection.
pub fn authorize(
    token_match: TokenMatch,
    action: SigningAction,
    policy: &RateLimitPolicy,
    ip_address: &str,
    now: TimestampNs,
) -> Result<Contract, ContractError> {
    let contract = match token_match {
        TokenMatch::NoMatch => {
            log_warn!("Signing token not found (ip {})", ip_address);
            return Err(ContractError::InvalidToken);
        }
        TokenMatch::Hash {
            contract,
            verified: false,
        } => {
            log_warn!(
                "Signing token hash mismatch for contract {} (ip {})",
                contract.contract_id,
                ip_address
            );
            record_attempt(policy, ip_address, Some(&contract.contract_id), false, now);
            return Err(ContractError::InvalidToken);
        }
        TokenMatch::Hash {
            contract,
            verified: true,
        } => contract,
        TokenMatch::Raw(contract) => {
            log_info!("Legacy raw signing token used for contract {}", contract.contract_id);
            contract
        }
    };

    check_rate_limit(policy, ip_address, Some(&contract.contract_id), now)?;

    if contract
        .signing_token_expires_at
        .is_some_and(|expires_at| now >= expires_at)
    {
        return Err(ContractError::TokenExpired);
    }
    if contract.status == ContractStatus::Cancelled {
        return Err(ContractError::ContractCancelled);
    }
    if contract.signing_token_used_at.is_some() {
        match action {
            SigningAction::View if contract.status.is_finalized() => {}
            SigningAction::View => return Err(ContractError::TokenAlreadyUsed),
            SigningAction::Submit if contract.status.is_finalized() => {
                return Err(ContractError::AlreadySigned)
            }
            SigningAction::Submit => return Err(ContractError::TokenAlreadyUsed),
        }
    } else if action == SigningAction::Submit && contract.status.is_finalized() {
        return Err(ContractError::AlreadySigned);
    }

    record_attempt(policy, ip_address, Some(&contract.contract_id), true, now);
    Ok(contract)
}

/// Full guard for one request, reading secrets and limits from `config`.
pub fn guard_signing_request(
    config: &ServiceConfig,
    token: &str,
    action: SigningAction,
    ip_address: &str,
    now: TimestampNs,
) -> Result<Contract, ContractError> {
    let policy = RateLimitPolicy::from_config(config);
    let result = authorize(
        resolve_token(&config.token_secret, token),
        action,
        &policy,
        ip_address,
        now,
    );
    if let Err(e) = &result {
        metrics::record(|m| {
            m.signing_rejections = m.signing_rejections.saturating_add(1);
            if *e == ContractError::RateLimited {
                m.rate_limited_requests = m.rate_limited_requests.saturating_add(1);
            }
        });
    }
    result
}

/// Checks the supplied password against the contract's, if it has one.
pub fn check_password(contract: &Contract, supplied: Option<&str>) -> Result<(), ContractError> {
    if !contract.is_password_protected() {
        return Ok(());
    }
    let stored = contract.password_hash.as_deref().unwrap_or_default();
    match supplied {
        None | Some("") => Err(ContractError::PasswordRequired),
        Some(password) if verify_password(password, stored) => Ok(()),
        Some(_) => Err(ContractError::PasswordInvalid),
    }
}

/// GET /contracts/sign/{token}
pub fn view_contract(
    token: &str,
    password: Option<&str>,
    ctx: &RequestContext,
    now: TimestampNs,
) -> Result<SigningView, ContractError> {
    let config = get_config();
    let contract = guard_signing_request(&config, token, SigningAction::View, &ctx.ip_address, now)?;
    check_password(&contract, password)?;

    if contract.status == ContractStatus::Sent {
        audit_service::record_event(
            &contract.contract_id,
            ContractEventType::ContractViewed,
            ActorType::Client,
            Some(contract.client_id.clone()),
            json!({ "ip_address": ctx.ip_address, "user_agent": ctx.user_agent }),
            now,
        );
    }
    metrics::record(|m| m.signing_views = m.signing_views.saturating_add(1));

    let client = parties::get_client(&contract.client_id);
    Ok(SigningView {
        contract: ContractView::from(&contract),
        client: client.as_ref().map(ClientView::from),
    })
}

/// Splits the optional `password` field off a submission body.
fn parse_submission(body: &[u8]) -> Result<(Option<String>, Value), ContractError> {
    let mut value: Value = serde_json::from_slice(body)
        .map_err(|e| ContractError::InvalidInput(format!("Malformed JSON body: {}", e)))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| ContractError::InvalidInput("Body must be a JSON object".to_string()))?;
    let password = object
        .remove("password")
        .and_then(|p| p.as_str().map(str::to_string));
    Ok((password, value))
}

fn validate_payload(value: Value) -> Result<SignaturePayload, ContractError> {
    let payload: SignaturePayload = serde_json::from_value(value)
        .map_err(|e| ContractError::InvalidInput(format!("Invalid signature payload: {}", e)))?;
    payload
        .validate()
        .map_err(|e| ContractError::InvalidInput(format!("Invalid signature payload: {}", e)))?;
    if payload.agree == Some(false) {
        return Err(ContractError::InvalidInput(
            "The terms must be accepted to sign".to_string(),
        ));
    }
    if let Some(data_url) = payload.signature_data_url.as_deref() {
        validate_signature_data_url(data_url)?;
    }
    Ok(payload)
}

/// POST /contracts/sign/{token}
///
/// Every check and the signing write complete before the first await, so two
/// concurrent submissions cannot both consume the token.
pub async fn submit_signature<P: PaymentProcessor>(
    processor: &P,
    token: &str,
    body: &[u8],
    ctx: &RequestContext,
    now: TimestampNs,
) -> Result<SubmitOutcome, ContractError> {
    let config = get_config();
    let contract =
        guard_signing_request(&config, token, SigningAction::Submit, &ctx.ip_address, now)?;

    if body.len() > MAX_BODY_BYTES {
        return Err(ContractError::PayloadTooLarge(format!(
            "Request body exceeds {} bytes",
            MAX_BODY_BYTES
        )));
    }
    let (password, value) = parse_submission(body)?;
    check_password(&contract, password.as_deref())?;
    let payload = validate_payload(value)?;
    let full_name = sanitize_full_name(&payload.full_name)?;

    let ip_address = if ctx.ip_address == "unknown" {
        payload.ip.clone().unwrap_or_else(|| ctx.ip_address.clone())
    } else {
        ctx.ip_address.clone()
    };
    let user_agent = ctx.user_agent.clone().or(payload.user_agent.clone());

    // 1. Persist the signature and consume the token
    let signature = Signature {
        signature_id: ids::next_id("sig")?,
        contract_id: contract.contract_id.clone(),
        full_name: full_name.clone(),
        signature_data_url: payload.signature_data_url.clone(),
        ip_address: ip_address.clone(),
        user_agent: user_agent.clone(),
        signed_at: now,
    };
    signatures::insert_signature(&signature);
    let contract = contracts::mark_signed(&contract.contract_id, now)?;
    log_info!("✍️ Contract {} signed by {}", contract.contract_id, full_name);

    // 2. Audit
    audit_service::record_event(
        &contract.contract_id,
        ContractEventType::ContractSigned,
        ActorType::Client,
        Some(contract.client_id.clone()),
        json!({
            "signer": full_name,
            "ip_address": ip_address,
            "user_agent": user_agent,
            "has_signature_image": signature.signature_data_url.is_some(),
        }),
        now,
    );
    metrics::record(|m| m.contracts_signed = m.contracts_signed.saturating_add(1));

    // 3. Deposit checkout; failure leaves the signature in place
    let client = parties::get_client(&contract.client_id);
    let checkout_url = if contract.deposit_amount > 0.0 {
        create_deposit_checkout(processor, &config, &contract, client.as_ref(), now).await
    } else {
        None
    };

    let contractor = parties::get_contractor(&contract.contractor_id);
    let notifications = notification_service::contract_signed(
        &contract,
        contractor.as_ref(),
        client.as_ref(),
        &full_name,
    );

    Ok(SubmitOutcome {
        response: SignResponse {
            success: true,
            contract: ContractView::from(&contract),
            checkout_url,
        },
        notifications,
    })
}

async fn create_deposit_checkout<P: PaymentProcessor>(
    processor: &P,
    config: &ServiceConfig,
    contract: &Contract,
    client: Option<&Client>,
    now: TimestampNs,
) -> Option<String> {
    let payment_id = match ids::next_id("pay") {
        Ok(id) => id,
        Err(e) => {
            log_error!("Could not allocate deposit payment for {}: {}", contract.contract_id, e);
            return None;
        }
    };
    let mut payment = Payment {
        payment_id: payment_id.clone(),
        contract_id: contract.contract_id.clone(),
        amount: contract.deposit_amount,
        status: PaymentStatus::Pending,
        payment_type: PaymentType::Deposit,
        payment_intent_id: None,
        refund_id: None,
        refunded_amount: None,
        refunded_at: None,
        created_at: now,
        updated_at: now,
    };
    payments::insert_payment(&payment);

    let base = config.app_base_url.trim_end_matches('/');
    let request = CheckoutSessionRequest {
        contract_id: contract.contract_id.clone(),
        payment_id,
        amount: contract.deposit_amount,
        description: format!("Deposit: {}", contract.title),
        customer_email: client.map(|c| c.email.clone()).filter(|e| !e.is_empty()),
        success_url: format!("{}/payments/success?contract={}", base, contract.contract_id),
        cancel_url: format!("{}/payments/cancelled?contract={}", base, contract.contract_id),
    };

    match processor.create_checkout_session(&request).await {
        Ok(session) => {
            // Replaced by the real payment intent when the webhook lands.
            payment.payment_intent_id = Some(session.id.clone());
            payments::insert_payment(&payment);
            session.url
        }
        Err(e) => {
            log_error!(
                "Deposit checkout for contract {} failed: {}",
                contract.contract_id,
                e
            );
            None
        }
    }
}
