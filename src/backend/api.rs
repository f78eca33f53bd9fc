// src/backend/api.rs
// Candid endpoints. Contractor calls authenticate by caller principal; the
// public signing page and processor webhooks come in through the HTTP gateway.

use crate::{
    adapter::stripe_adapter::StripeClient,
    error::ContractError,
    http::{self, HttpRequest, HttpResponse},
    metrics::{self, ServiceMetrics},
    models::{Client, ConfigUpdate, ContractEvent, ContractView, Contractor, Payment},
    services::{
        contract_service::{
            self, CreateClientRequest, CreateContractRequest, RegisterContractorRequest,
            SendContractRequest, SendContractResponse,
        },
        notification_service,
        void_service::{self, VoidContractRequest, VoidContractResponse},
    },
    storage::config::{self, get_config, ServiceConfig},
    utils::{guards::admin_guard, log::log_info, time::get_current_time_ns},
};
use ic_cdk::api::management_canister::http_request::{
    HttpResponse as OutcallResponse, TransformArgs,
};
use ic_cdk::caller;
use ic_cdk_macros::{query, update};

// --- HTTP gateway ---

#[query]
fn http_request(req: HttpRequest) -> HttpResponse {
    http::handle_query(&req)
}

#[update]
async fn http_request_update(req: HttpRequest) -> HttpResponse {
    let processor = StripeClient::from_config(&get_config());
    let (response, notifications) =
        http::handle_update(&processor, &req, get_current_time_ns()).await;
    notification_service::dispatch(notifications);
    response
}

/// Strips headers from outcall responses so replicas reach consensus.
#[query]
fn transform_outcall(args: TransformArgs) -> OutcallResponse {
    OutcallResponse {
        status: args.response.status,
        headers: vec![],
        body: args.response.body,
    }
}

// --- Contractors, clients and contracts ---

#[update]
fn register_contractor(req: RegisterContractorRequest) -> Result<Contractor, ContractError> {
    contract_service::register_contractor(caller(), req, get_current_time_ns())
}

#[update]
fn create_client(req: CreateClientRequest) -> Result<Client, ContractError> {
    contract_service::create_client(caller(), req, get_current_time_ns())
}

#[update]
fn create_contract(req: CreateContractRequest) -> Result<ContractView, ContractError> {
    contract_service::create_contract(caller(), req, get_current_time_ns())
}

#[update]
fn send_contract(
    contract_id: String,
    req: SendContractRequest,
) -> Result<SendContractResponse, ContractError> {
    let outcome = contract_service::send_contract(caller(), &contract_id, req, get_current_time_ns())?;
    notification_service::dispatch(outcome.notifications);
    Ok(outcome.response)
}

#[query]
fn get_contract(contract_id: String) -> Result<ContractView, ContractError> {
    contract_service::get_contract(caller(), &contract_id)
}

#[query]
fn list_contract_events(contract_id: String) -> Result<Vec<ContractEvent>, ContractError> {
    contract_service::list_contract_events(caller(), &contract_id)
}

#[query]
fn list_contract_payments(contract_id: String) -> Result<Vec<Payment>, ContractError> {
    contract_service::list_contract_payments(caller(), &contract_id)
}

/// POST /contracts/{id}/void
#[update]
async fn void_contract(
    contract_id: String,
    req: VoidContractRequest,
) -> Result<VoidContractResponse, ContractError> {
    let processor = StripeClient::from_config(&get_config());
    let outcome = void_service::void_contract(
        &processor,
        caller(),
        &contract_id,
        req,
        get_current_time_ns(),
    )
    .await?;
    notification_service::dispatch(outcome.notifications);
    Ok(outcome.response)
}

// --- Admin ---

#[update(guard = "admin_guard")]
fn update_config(update: ConfigUpdate) -> Result<ServiceConfig, ContractError> {
    let updated = config::update_config(|c| update.apply_to(c)).map_err(ContractError::StorageError)?;
    log_info!("Service config updated by {}", caller());
    Ok(updated.redacted())
}

#[query(guard = "admin_guard", name = "get_config")]
fn get_service_config() -> ServiceConfig {
    get_config().redacted()
}

#[query(guard = "admin_guard")]
fn get_metrics() -> ServiceMetrics {
    metrics::snapshot()
}
