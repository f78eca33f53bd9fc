// src/backend/services/test_support.rs
// Fixtures and an in-memory payment processor for service tests.

use crate::adapter::stripe_adapter::{
    CheckoutSession, CheckoutSessionRequest, Charge, Expandable, PaymentIntent, PaymentProcessor,
    ProcessorError, Refund, RefundRequest,
};
use crate::models::{
    Client, Contract, ContractStatus, Contractor, Payment, PaymentStatus, PaymentType,
    TimestampNs, NANOS_PER_DAY,
};
use crate::storage::{config, contracts, parties, payments};
use crate::utils::crypto::{hash_password, hash_signing_token};
use candid::Principal;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub const TOKEN_SECRET: &str = "test-token-secret";
pub const NOW: TimestampNs = 1_700_000_000 * 1_000_000_000;

pub fn contractor_principal() -> Principal {
    Principal::from_slice(&[1, 2, 3])
}

pub fn other_principal() -> Principal {
    Principal::from_slice(&[9, 9, 9])
}

pub fn configure() {
    config::update_config(|c| {
        c.token_secret = TOKEN_SECRET.to_string();
        c.rate_limit_max_attempts = 5;
        c.rate_limit_window_minutes = 15;
    })
    .unwrap();
}

pub fn seed_parties() -> (Contractor, Client) {
    let contractor = Contractor {
        contractor_id: contractor_principal(),
        company_id: "cmp_1".into(),
        display_name: "Acme Builders".into(),
        email: "pro@acme.test".into(),
        created_at: 0,
    };
    let client = Client {
        client_id: "cli_1".into(),
        company_id: "cmp_1".into(),
        name: "Jane Client".into(),
        email: "jane@client.test".into(),
        created_at: 0,
    };
    parties::insert_contractor(&contractor);
    parties::insert_client(&client);
    (contractor, client)
}

/// Stores a sent contract whose signing token is `token`.
pub fn sent_contract(id: &str, token: &str, deposit: f64, total: f64) -> Contract {
    configure();
    seed_parties();
    let contract = Contract {
        contract_id: id.to_string(),
        contractor_id: contractor_principal(),
        company_id: "cmp_1".into(),
        client_id: "cli_1".into(),
        title: "Kitchen remodel".into(),
        content: "Full scope of work".into(),
        status: ContractStatus::Sent,
        signing_token: None,
        signing_token_hash: Some(hash_signing_token(TOKEN_SECRET, token)),
        signing_token_expires_at: Some(NOW + 30 * NANOS_PER_DAY),
        signing_token_used_at: None,
        password_hash: None,
        deposit_amount: deposit,
        total_amount: total,
        field_values: None,
        contractor_signed_at: Some(NOW - NANOS_PER_DAY),
        signed_at: None,
        sent_at: Some(NOW - NANOS_PER_DAY),
        voided_at: None,
        created_at: NOW - 2 * NANOS_PER_DAY,
        updated_at: NOW - NANOS_PER_DAY,
    };
    contracts::insert_contract(&contract);
    contract
}

pub fn protect_with_password(contract_id: &str, password: &str) {
    let mut contract = contracts::get_contract(contract_id).unwrap();
    contract.password_hash = Some(hash_password(password, &[5u8; 16]));
    contracts::insert_contract(&contract);
}

pub fn completed_payment(id: &str, contract_id: &str, amount: f64, reference: &str) -> Payment {
    let payment = Payment {
        payment_id: id.to_string(),
        contract_id: contract_id.to_string(),
        amount,
        status: PaymentStatus::Completed,
        payment_type: PaymentType::Deposit,
        payment_intent_id: Some(reference.to_string()),
        refund_id: None,
        refunded_amount: None,
        refunded_at: None,
        created_at: NOW,
        updated_at: NOW,
    };
    payments::insert_payment(&payment);
    payment
}

pub fn pending_payment(id: &str, contract_id: &str, amount: f64) -> Payment {
    let payment = Payment {
        payment_id: id.to_string(),
        contract_id: contract_id.to_string(),
        amount,
        status: PaymentStatus::Pending,
        payment_type: PaymentType::RemainingBalance,
        payment_intent_id: None,
        refund_id: None,
        refunded_amount: None,
        refunded_at: None,
        created_at: NOW,
        updated_at: NOW,
    };
    payments::insert_payment(&payment);
    payment
}

#[derive(Default)]
pub struct FakeProcessor {
    pub sessions: RefCell<HashMap<String, CheckoutSession>>,
    pub intents: RefCell<HashMap<String, PaymentIntent>>,
    pub charges: RefCell<HashMap<String, Charge>>,
    pub checkout_requests: RefCell<Vec<CheckoutSessionRequest>>,
    pub refund_requests: RefCell<Vec<RefundRequest>>,
    pub checkout_error: RefCell<Option<ProcessorError>>,
    pub refund_error: RefCell<Option<ProcessorError>>,
    pub calls: Cell<u32>,
}

impl FakeProcessor {
    /// Registers a succeeded intent `pi_{suffix}` with charge `ch_{suffix}`.
    pub fn with_succeeded_intent(self, suffix: &str, amount_cents: u64) -> Self {
        let charge_id = format!("ch_{}", suffix);
        self.charges.borrow_mut().insert(
            charge_id.clone(),
            Charge {
                id: charge_id.clone(),
                refunded: false,
                amount_refunded: 0,
            },
        );
        self.intents.borrow_mut().insert(
            format!("pi_{}", suffix),
            PaymentIntent {
                id: format!("pi_{}", suffix),
                status: "succeeded".into(),
                amount: amount_cents,
                latest_charge: Some(Expandable::Id(charge_id)),
            },
        );
        self
    }

    pub fn with_session(self, session_id: &str, intent_id: &str) -> Self {
        self.sessions.borrow_mut().insert(
            session_id.to_string(),
            CheckoutSession {
                id: session_id.to_string(),
                payment_intent: Some(Expandable::Id(intent_id.to_string())),
                ..CheckoutSession::default()
            },
        );
        self
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn missing(kind: &str, id: &str) -> ProcessorError {
        ProcessorError::new(
            Some("resource_missing"),
            format!("No such {}: '{}'", kind, id),
            Some(404),
        )
    }
}

impl PaymentProcessor for FakeProcessor {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError> {
        self.tick();
        self.checkout_requests.borrow_mut().push(request.clone());
        if let Some(err) = self.checkout_error.borrow().clone() {
            return Err(err);
        }
        let id = format!("cs_{}", request.payment_id);
        Ok(CheckoutSession {
            id: id.clone(),
            url: Some(format!("https://checkout.test/{}", id)),
            ..CheckoutSession::default()
        })
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ProcessorError> {
        self.tick();
        self.sessions
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| Self::missing("checkout.session", id))
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, ProcessorError> {
        self.tick();
        self.intents
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| Self::missing("payment_intent", id))
    }

    async fn retrieve_charge(&self, id: &str) -> Result<Charge, ProcessorError> {
        self.tick();
        self.charges
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| Self::missing("charge", id))
    }

    async fn create_refund(&self, request: &RefundRequest) -> Result<Refund, ProcessorError> {
        self.tick();
        self.refund_requests.borrow_mut().push(request.clone());
        if let Some(err) = self.refund_error.borrow().clone() {
            return Err(err);
        }
        Ok(Refund {
            id: format!("re_{}", self.refund_requests.borrow().len()),
            status: Some("succeeded".into()),
            amount: request.amount_cents,
        })
    }
}
