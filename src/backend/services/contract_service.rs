// src/backend/services/contract_service.rs
// Contractor-side lifecycle: registration, clients, drafting and sending.

use crate::adapter::email_adapter::EmailMessage;
use crate::error::ContractError;
use crate::metrics;
use crate::models::{
    ActorType, Client, Contract, ContractEvent, ContractEventType, ContractId, ContractStatus,
    ContractView, Contractor, Dollars, Payment, PrincipalId, TimestampNs, NANOS_PER_DAY,
};
use crate::services::{audit_service, notification_service};
use crate::storage::config::get_config;
use crate::storage::{contract_events, contracts, ids, parties, payments};
use crate::utils::crypto::{hash_password, hash_signing_token};
use crate::utils::guards::require_authenticated;
use crate::utils::log::log_info;
use crate::utils::rng::{generate_signing_token, random_bytes};
use candid::CandidType;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct RegisterContractorRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub company_id: Option<String>,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct CreateContractRequest {
    #[validate(length(min = 1))]
    pub client_id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 200000))]
    pub content: String,
    #[validate(range(min = 0.0))]
    pub deposit_amount: Dollars,
    #[validate(range(min = 0.0))]
    pub total_amount: Dollars,
    #[validate(length(max = 100000))]
    pub field_values: Option<String>,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate, Default)]
pub struct SendContractRequest {
    #[validate(length(min = 4, max = 128))]
    pub password: Option<String>,
    /// Stamp the contractor's countersignature when sending.
    pub countersign: bool,
}

#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SendContractResponse {
    pub contract: ContractView,
    /// Shown once; only the keyed hash of the token is stored.
    pub signing_url: String,
    pub expires_at: TimestampNs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub response: SendContractResponse,
    pub notifications: Vec<EmailMessage>,
}

pub fn validate_request<T: Validate>(req: &T) -> Result<(), ContractError> {
    req.validate()
        .map_err(|e| ContractError::InvalidInput(e.to_string()))
}

fn require_contractor(caller: PrincipalId) -> Result<Contractor, ContractError> {
    require_authenticated(caller)?;
    parties::get_contractor(&caller).ok_or_else(|| {
        ContractError::Forbidden("Caller is not a registered contractor".to_string())
    })
}

/// Loads a contract the caller may manage: the caller must be its contractor
/// and belong to its company.
pub fn load_owned_contract(
    caller: PrincipalId,
    contract_id: &str,
) -> Result<Contract, ContractError> {
    require_authenticated(caller)?;
    let contract = contracts::get_contract(contract_id)
        .ok_or_else(|| ContractError::NotFound("Contract".to_string()))?;
    let same_company = parties::get_contractor(&caller)
        .is_some_and(|contractor| contractor.company_id == contract.company_id);
    if contract.contractor_id != caller || !same_company {
        return Err(ContractError::Forbidden(
            "You do not have permission to manage this contract".to_string(),
        ));
    }
    Ok(contract)
}

/// Registers the caller as a contractor, or refreshes an existing profile.
/// The company is fixed at first registration.
pub fn register_contractor(
    caller: PrincipalId,
    req: RegisterContractorRequest,
    now: TimestampNs,
) -> Result<Contractor, ContractError> {
    require_authenticated(caller)?;
    validate_request(&req)?;

    let contractor = match parties::get_contractor(&caller) {
        Some(existing) => Contractor {
            display_name: req.display_name,
            email: req.email,
            ..existing
        },
        None => Contractor {
            contractor_id: caller,
            company_id: match req.company_id {
                Some(company_id) => company_id,
                None => ids::next_id("cmp")?,
            },
            display_name: req.display_name,
            email: req.email,
            created_at: now,
        },
    };
    parties::insert_contractor(&contractor);
    log_info!("Contractor {} registered under {}", caller, contractor.company_id);
    Ok(contractor)
}

pub fn create_client(
    caller: PrincipalId,
    req: CreateClientRequest,
    now: TimestampNs,
) -> Result<Client, ContractError> {
    let contractor = require_contractor(caller)?;
    validate_request(&req)?;
    let client = Client {
        client_id: ids::next_id("cli")?,
        company_id: contractor.company_id,
        name: req.name.trim().to_string(),
        email: req.email,
        created_at: now,
    };
    parties::insert_client(&client);
    Ok(client)
}

pub fn create_contract(
    caller: PrincipalId,
    req: CreateContractRequest,
    now: TimestampNs,
) -> Result<ContractView, ContractError> {
    let contractor = require_contractor(caller)?;
    validate_request(&req)?;
    if !req.deposit_amount.is_finite() || !req.total_amount.is_finite() {
        return Err(ContractError::InvalidInput("Amounts must be finite".to_string()));
    }
    if let Some(raw) = req.field_values.as_deref() {
        let is_object = serde_json::from_str::<serde_json::Value>(raw)
            .map(|v| v.is_object())
            .unwrap_or(false);
        if !is_object {
            return Err(ContractError::InvalidInput(
                "field_values must be a JSON object".to_string(),
            ));
        }
    }
    if req.deposit_amount > req.total_amount {
        return Err(ContractError::InvalidInput(
            "Deposit cannot exceed the total amount".to_string(),
        ));
    }
    let client = parties::get_client(&req.client_id)
        .filter(|c| c.company_id == contractor.company_id)
        .ok_or_else(|| ContractError::NotFound("Client".to_string()))?;

    let contract = Contract {
        contract_id: ids::next_id("con")?,
        contractor_id: caller,
        company_id: contractor.company_id,
        client_id: client.client_id,
        title: req.title.trim().to_string(),
        content: req.content,
        status: ContractStatus::Draft,
        signing_token: None,
        signing_token_hash: None,
        signing_token_expires_at: None,
        signing_token_used_at: None,
        password_hash: None,
        deposit_amount: req.deposit_amount,
        total_amount: req.total_amount,
        field_values: req.field_values,
        contractor_signed_at: None,
        signed_at: None,
        sent_at: None,
        voided_at: None,
        created_at: now,
        updated_at: now,
    };
    contracts::insert_contract(&contract);

    audit_service::record_event(
        &contract.contract_id,
        ContractEventType::ContractCreated,
        ActorType::Contractor,
        Some(caller.to_text()),
        json!({ "title": contract.title, "total_amount": contract.total_amount }),
        now,
    );
    metrics::record(|m| m.contracts_created = m.contracts_created.saturating_add(1));
    Ok(ContractView::from(&contract))
}

/// Issues a fresh signing link. Any earlier link stops working.
pub fn send_contract(
    caller: PrincipalId,
    contract_id: &ContractId,
    req: SendContractRequest,
    now: TimestampNs,
) -> Result<SendOutcome, ContractError> {
    let mut contract = load_owned_contract(caller, contract_id)?;
    validate_request(&req)?;
    if !matches!(
        contract.status,
        ContractStatus::Draft | ContractStatus::Ready | ContractStatus::Sent
    ) {
        return Err(ContractError::InvalidState(format!(
            "A {} contract cannot be sent",
            contract.status.as_str()
        )));
    }

    let config = get_config();
    if config.token_secret.is_empty() {
        return Err(ContractError::InternalError(
            "Signing token secret is not configured".to_string(),
        ));
    }

    let token = generate_signing_token()?;
    let expires_at = now.saturating_add(config.signing_token_ttl_days.saturating_mul(NANOS_PER_DAY));
    contract.signing_token = None;
    contract.signing_token_hash = Some(hash_signing_token(&config.token_secret, &token));
    contract.signing_token_expires_at = Some(expires_at);
    contract.signing_token_used_at = None;
    contract.password_hash = match req.password.as_deref() {
        Some(password) => Some(hash_password(password, &random_bytes(16)?)),
        None => None,
    };
    if req.countersign && contract.contractor_signed_at.is_none() {
        contract.contractor_signed_at = Some(now);
    }
    contract.status = ContractStatus::Sent;
    contract.sent_at = Some(now);
    contract.updated_at = now;
    contracts::insert_contract(&contract);

    let signing_url = format!(
        "{}/contracts/sign/{}",
        config.app_base_url.trim_end_matches('/'),
        token
    );
    audit_service::record_event(
        &contract.contract_id,
        ContractEventType::ContractSent,
        ActorType::Contractor,
        Some(caller.to_text()),
        json!({
            "expires_at": expires_at,
            "password_protected": contract.is_password_protected(),
            "countersigned": contract.contractor_signed_at.is_some(),
        }),
        now,
    );
    metrics::record(|m| m.contracts_sent = m.contracts_sent.saturating_add(1));
    log_info!("📨 Contract {} sent, link expires at {}", contract.contract_id, expires_at);

    let notifications = parties::get_client(&contract.client_id)
        .filter(|client| !client.email.is_empty())
        .map(|client| vec![notification_service::contract_sent(&contract, &client, &signing_url)])
        .unwrap_or_default();

    Ok(SendOutcome {
        response: SendContractResponse {
            contract: ContractView::from(&contract),
            signing_url,
            expires_at,
        },
        notifications,
    })
}

pub fn get_contract(caller: PrincipalId, contract_id: &str) -> Result<ContractView, ContractError> {
    load_owned_contract(caller, contract_id).map(|c| ContractView::from(&c))
}

pub fn list_contract_events(
    caller: PrincipalId,
    contract_id: &str,
) -> Result<Vec<ContractEvent>, ContractError> {
    load_owned_contract(caller, contract_id)?;
    Ok(contract_events::list_for_contract(contract_id))
}

pub fn list_contract_payments(
    caller: PrincipalId,
    contract_id: &str,
) -> Result<Vec<Payment>, ContractError> {
    load_owned_contract(caller, contract_id)?;
    Ok(payments::list_for_contract(contract_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signing_service::{view_contract, RequestContext};
    use crate::services::test_support::{configure, other_principal, NOW};
    use crate::utils::rng::seed_internal_rng;
    use candid::Principal;

    fn owner() -> Principal {
        Principal::from_slice(&[4, 5, 6])
    }

    fn setup() -> (Contractor, Client) {
        configure();
        seed_internal_rng([11u8; 32]);
        let contractor = register_contractor(
            owner(),
            RegisterContractorRequest {
                display_name: "Acme".into(),
                email: "pro@acme.test".into(),
                company_id: None,
            },
            NOW,
        )
        .unwrap();
        let client = create_client(
            owner(),
            CreateClientRequest {
                name: " Jane ".into(),
                email: "jane@client.test".into(),
            },
            NOW,
        )
        .unwrap();
        (contractor, client)
    }

    fn draft(client_id: &str, deposit: f64, total: f64) -> Result<ContractView, ContractError> {
        create_contract(
            owner(),
            CreateContractRequest {
                client_id: client_id.to_string(),
                title: "Deck build".into(),
                content: "Scope".into(),
                deposit_amount: deposit,
                total_amount: total,
                field_values: Some(r#"{"paymentSchedule":"full"}"#.into()),
            },
            NOW,
        )
    }

    #[test]
    fn registration_allocates_a_company_once() {
        let (contractor, client) = setup();
        assert!(contractor.company_id.starts_with("cmp_"));
        assert_eq!(client.company_id, contractor.company_id);
        assert_eq!(client.name, "Jane");

        let again = register_contractor(
            owner(),
            RegisterContractorRequest {
                display_name: "Acme Renamed".into(),
                email: "new@acme.test".into(),
                company_id: Some("cmp_other".into()),
            },
            NOW,
        )
        .unwrap();
        assert_eq!(again.company_id, contractor.company_id);
        assert_eq!(again.display_name, "Acme Renamed");
    }

    #[test]
    fn anonymous_and_unregistered_callers_are_rejected() {
        configure();
        assert_eq!(
            create_client(
                Principal::anonymous(),
                CreateClientRequest { name: "x".into(), email: "x@y.test".into() },
                NOW
            )
            .unwrap_err(),
            ContractError::AuthenticationRequired
        );
        assert!(matches!(
            create_client(
                other_principal(),
                CreateClientRequest { name: "x".into(), email: "x@y.test".into() },
                NOW
            ),
            Err(ContractError::Forbidden(_))
        ));
    }

    #[test]
    fn contract_validation() {
        let (_, client) = setup();
        assert!(matches!(
            draft(&client.client_id, 600.0, 500.0),
            Err(ContractError::InvalidInput(_))
        ));
        assert!(matches!(
            draft(&client.client_id, -1.0, 500.0),
            Err(ContractError::InvalidInput(_))
        ));
        assert_eq!(
            draft("cli_unknown", 0.0, 500.0).unwrap_err(),
            ContractError::NotFound("Client".into())
        );
        let view = draft(&client.client_id, 100.0, 500.0).unwrap();
        assert_eq!(view.status, ContractStatus::Draft);
    }

    #[test]
    fn sending_issues_a_working_link_and_stores_only_the_hash() {
        let (_, client) = setup();
        let view = draft(&client.client_id, 0.0, 500.0).unwrap();
        let outcome = send_contract(
            owner(),
            &view.id,
            SendContractRequest {
                password: Some("letmein".into()),
                countersign: true,
            },
            NOW,
        )
        .unwrap();
        let token = outcome
            .response
            .signing_url
            .rsplit('/')
            .next()
            .unwrap()
            .to_string();
        assert_eq!(token.len(), 64);
        assert_eq!(outcome.notifications.len(), 1);

        let stored = contracts::get_contract(&view.id).unwrap();
        assert_eq!(stored.status, ContractStatus::Sent);
        assert_eq!(stored.signing_token, None);
        assert_ne!(stored.signing_token_hash.as_deref(), Some(token.as_str()));
        assert!(stored.contractor_signed_at.is_some());
        assert_eq!(
            stored.signing_token_expires_at,
            Some(NOW + 30 * NANOS_PER_DAY)
        );

        let ctx = RequestContext {
            ip_address: "20.0.0.1".into(),
            user_agent: None,
        };
        assert_eq!(
            view_contract(&token, None, &ctx, NOW),
            Err(ContractError::PasswordRequired)
        );
        assert!(view_contract(&token, Some("letmein"), &ctx, NOW).is_ok());

        // Re-sending replaces the link.
        let resent = send_contract(owner(), &view.id, SendContractRequest::default(), NOW).unwrap();
        assert_ne!(resent.response.signing_url, outcome.response.signing_url);
        assert_eq!(
            view_contract(&token, None, &ctx, NOW),
            Err(ContractError::InvalidToken)
        );
    }

    #[test]
    fn owner_only_reads() {
        let (_, client) = setup();
        let view = draft(&client.client_id, 0.0, 500.0).unwrap();
        assert!(get_contract(owner(), &view.id).is_ok());
        assert_eq!(list_contract_events(owner(), &view.id).unwrap().len(), 1);
        assert!(list_contract_payments(owner(), &view.id).unwrap().is_empty());
        assert!(matches!(
            get_contract(other_principal(), &view.id),
            Err(ContractError::Forbidden(_))
        ));
    }

    #[test]
    fn cancelled_contracts_cannot_be_resent() {
        let (_, client) = setup();
        let view = draft(&client.client_id, 0.0, 500.0).unwrap();
        contracts::cancel_if_voidable(&view.id, NOW);
        assert!(matches!(
            send_contract(owner(), &view.id, SendContractRequest::default(), NOW),
            Err(ContractError::InvalidState(_))
        ));
    }
}
