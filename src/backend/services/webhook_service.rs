// src/backend/services/webhook_service.rs
// Stripe webhook verification and checkout reconciliation.

use crate::adapter::stripe_adapter::CheckoutSession;
use crate::error::ContractError;
use crate::metrics;
use crate::models::{
    amounts_match, from_cents, ActorType, ContractEventType, ContractStatus, Payment,
    PaymentStatus, TimestampNs, NANOS_PER_SECOND,
};
use crate::services::audit_service;
use crate::storage::config::get_config;
use crate::storage::{contracts, payments, webhook_events};
use crate::utils::crypto::verify_webhook_signature;
use crate::utils::log::{log_info, log_warn};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Deserialize, Debug)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    Duplicate,
    Ignored,
}

/// Verifies and applies one webhook delivery.
pub fn handle_stripe_webhook(
    body: &[u8],
    signature_header: Option<&str>,
    now: TimestampNs,
) -> Result<WebhookOutcome, ContractError> {
    let config = get_config();
    if config.stripe_webhook_secret.is_empty() {
        return Err(ContractError::InternalError(
            "Webhook secret is not configured".to_string(),
        ));
    }
    let header = signature_header.ok_or_else(|| {
        ContractError::InvalidInput("Missing Stripe-Signature header".to_string())
    })?;
    if !verify_webhook_signature(body, header, &config.stripe_webhook_secret, now / NANOS_PER_SECOND)? {
        log_warn!("Rejected webhook with an invalid signature");
        return Err(ContractError::InvalidInput(
            "Invalid webhook signature".to_string(),
        ));
    }

    let event: StripeEvent = serde_json::from_slice(body)
        .map_err(|e| ContractError::InvalidInput(format!("Malformed webhook event: {}", e)))?;
    if webhook_events::is_processed(&event.id) {
        log_info!("Webhook {} already processed", event.id);
        return Ok(WebhookOutcome::Duplicate);
    }

    let outcome = match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session = parse_session(event.data.object)?;
            complete_checkout(&session, &event.id, now);
            WebhookOutcome::Processed
        }
        "checkout.session.expired" => {
            let session = parse_session(event.data.object)?;
            expire_checkout(&session, &event.id, now);
            WebhookOutcome::Processed
        }
        other => {
            log_info!("Ignoring webhook event type {}", other);
            WebhookOutcome::Ignored
        }
    };

    webhook_events::mark_processed(&event.id, now);
    metrics::record(|m| m.webhooks_processed = m.webhooks_processed.saturating_add(1));
    Ok(outcome)
}

fn parse_session(object: serde_json::Value) -> Result<CheckoutSession, ContractError> {
    serde_json::from_value(object)
        .map_err(|e| ContractError::InvalidInput(format!("Malformed checkout session: {}", e)))
}

/// Metadata `payment_id` first, then the stored session id.
fn find_payment(session: &CheckoutSession) -> Option<Payment> {
    if let Some(payment) = session
        .metadata
        .get("payment_id")
        .and_then(|id| payments::get_payment(id))
    {
        return Some(payment);
    }
    session
        .metadata
        .get("contract_id")
        .and_then(|contract_id| payments::find_by_processor_reference(contract_id, &session.id))
}

fn complete_checkout(session: &CheckoutSession, event_id: &str, now: TimestampNs) {
    let Some(mut payment) = find_payment(session) else {
        log_warn!("No payment matches checkout session {}", session.id);
        return;
    };
    if payment.status == PaymentStatus::Completed {
        log_info!("Payment {} already completed", payment.payment_id);
        return;
    }
    let Some(contract) = contracts::get_contract(&payment.contract_id) else {
        log_warn!("Payment {} references a missing contract", payment.payment_id);
        return;
    };
    if contract.status == ContractStatus::Cancelled {
        log_warn!(
            "Checkout {} completed on cancelled contract {}; payment {} needs manual review",
            session.id,
            contract.contract_id,
            payment.payment_id
        );
        return;
    }

    let amount_paid = session.amount_total.map(from_cents);
    if let Some(paid) = amount_paid {
        if !amounts_match(paid, payment.amount) {
            log_warn!(
                "Amount mismatch for payment {}: expected {:.2}, received {:.2}",
                payment.payment_id,
                payment.amount,
                paid
            );
        }
    }

    let intent_id = session
        .payment_intent
        .as_ref()
        .map(|intent| intent.id().to_string())
        .unwrap_or_else(|| session.id.clone());
    payment.status = PaymentStatus::Completed;
    payment.payment_intent_id = Some(intent_id.clone());
    payment.updated_at = now;
    payments::insert_payment(&payment);

    if contract.status == ContractStatus::Signed {
        contracts::update_status(&contract.contract_id, ContractStatus::Paid, now);
    }
    log_info!("💰 Payment {} completed via {}", payment.payment_id, intent_id);

    audit_service::record_event(
        &contract.contract_id,
        ContractEventType::PaymentCompleted,
        ActorType::Processor,
        Some(event_id.to_string()),
        json!({
            "payment_id": payment.payment_id,
            "payment_type": payment.payment_type.as_str(),
            "amount": payment.amount,
            "amount_paid": amount_paid,
            "payment_intent": intent_id,
        }),
        now,
    );
}

fn expire_checkout(session: &CheckoutSession, event_id: &str, now: TimestampNs) {
    let Some(payment) = find_payment(session) else {
        log_warn!("No payment matches expired checkout session {}", session.id);
        return;
    };
    if payment.status != PaymentStatus::Pending {
        return;
    }
    if let Err(e) = payments::update_status(&payment.payment_id, PaymentStatus::Failed, now) {
        log_warn!("Failed to expire payment {}: {}", payment.payment_id, e);
        return;
    }
    audit_service::record_event(
        &payment.contract_id,
        ContractEventType::PaymentExpired,
        ActorType::Processor,
        Some(event_id.to_string()),
        json!({ "payment_id": payment.payment_id, "session_id": session.id }),
        now,
    );
}
