// src/backend/services/notification_service.rs
// Builds transactional emails and dispatches them after the current message
// has replied.

use crate::adapter::email_adapter::{send_email, EmailMessage};
use crate::models::{Client, Contract, Contractor};
use crate::storage::config::get_config;
use crate::utils::log::log_warn;
use std::time::Duration;

pub fn contract_sent(contract: &Contract, client: &Client, signing_url: &str) -> EmailMessage {
    EmailMessage {
        to: client.email.clone(),
        subject: format!("Please review and sign: {}", contract.title),
        html: format!(
            "<p>Hi {},</p><p>You have a new contract to review: <strong>{}</strong>.</p>\
             <p><a href=\"{}\">Review and sign</a></p>",
            escape_html(&client.name),
            escape_html(&contract.title),
            signing_url
        ),
    }
}

/// Contractor alert plus client confirmation, skipping parties without an email.
pub fn contract_signed(
    contract: &Contract,
    contractor: Option<&Contractor>,
    client: Option<&Client>,
    signer_name: &str,
) -> Vec<EmailMessage> {
    let mut messages = Vec::new();
    if let Some(contractor) = contractor.filter(|c| !c.email.is_empty()) {
        messages.push(EmailMessage {
            to: contractor.email.clone(),
            subject: format!("Contract signed: {}", contract.title),
            html: format!(
                "<p>{} signed <strong>{}</strong>.</p>",
                escape_html(signer_name),
                escape_html(&contract.title)
            ),
        });
    }
    if let Some(client) = client.filter(|c| !c.email.is_empty()) {
        messages.push(EmailMessage {
            to: client.email.clone(),
            subject: format!("You signed: {}", contract.title),
            html: format!(
                "<p>Thanks {}, your signature on <strong>{}</strong> was received.</p>",
                escape_html(signer_name),
                escape_html(&contract.title)
            ),
        });
    }
    messages
}

pub fn contract_voided(contract: &Contract, client: &Client, message: &str) -> EmailMessage {
    EmailMessage {
        to: client.email.clone(),
        subject: format!("Contract cancelled: {}", contract.title),
        html: format!(
            "<p>Hi {},</p><p>The contract <strong>{}</strong> has been cancelled.</p><p>{}</p>",
            escape_html(&client.name),
            escape_html(&contract.title),
            escape_html(message)
        ),
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Sends `messages` from a zero-delay timer. Failures are logged only.
pub fn dispatch(messages: Vec<EmailMessage>) {
    if messages.is_empty() {
        return;
    }
    ic_cdk_timers::set_timer(Duration::ZERO, move || {
        ic_cdk::spawn(async move {
            let config = get_config();
            for message in &messages {
                if let Err(e) = send_email(&config, message).await {
                    log_warn!("Notification '{}' to {} failed: {}", message.subject, message.to, e);
                }
            }
        })
    });
}
