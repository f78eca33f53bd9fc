// src/backend/lib.rs

pub mod adapter;
pub mod api;
pub mod error;
pub mod http;
pub mod metrics;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

use crate::error::ContractError;
use crate::http::{HttpRequest, HttpResponse};
use crate::metrics::ServiceMetrics;
use crate::models::{
    Client, ConfigUpdate, ContractEvent, ContractView, Contractor, InitArgs, Payment,
};
use crate::services::contract_service::{
    CreateClientRequest, CreateContractRequest, RegisterContractorRequest, SendContractRequest,
    SendContractResponse,
};
use crate::services::scheduler;
use crate::services::void_service::{VoidContractRequest, VoidContractResponse};
use crate::storage::config::{self, ServiceConfig};
use crate::utils::log::{log_error, log_info};
use crate::utils::{rng, time::get_current_time_ns};
use ic_cdk::api::management_canister::http_request::{
    HttpResponse as OutcallResponse, TransformArgs,
};
use std::time::Duration;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[ic_cdk::init]
fn init(args: InitArgs) {
    let result = config::update_config(|c| {
        c.admin = args.admin_principal;
        if let Some(update) = args.config {
            update.apply_to(c);
        }
    });
    if let Err(e) = result {
        ic_cdk::trap(&format!("Failed to store initial config: {}", e));
    }
    start_timers();
    log_info!("Pay2Start backend canister initialized.");
}

#[ic_cdk::post_upgrade]
fn post_upgrade() {
    start_timers();
    log_info!("Pay2Start backend canister upgraded.");
}

/// Timers do not survive upgrades; both lifecycle hooks re-arm them.
fn start_timers() {
    ic_cdk_timers::set_timer(Duration::ZERO, || ic_cdk::spawn(bootstrap()));
    ic_cdk_timers::set_timer_interval(MAINTENANCE_INTERVAL, || {
        if let Err(e) = scheduler::perform_maintenance(get_current_time_ns()) {
            log_error!("Maintenance failed: {}", e);
        }
    });
}

/// Seeds the RNG and, on first install without one, the token secret.
async fn bootstrap() {
    if let Err(e) = rng::initialize_internal_rng().await {
        log_error!("RNG initialization failed: {}", e);
        return;
    }
    if config::get_config().token_secret.is_empty() {
        let secret = match rng::random_bytes(32) {
            Ok(bytes) => hex::encode(bytes),
            Err(e) => {
                log_error!("Could not generate token secret: {}", e);
                return;
            }
        };
        match config::update_config(|c| c.token_secret = secret) {
            Ok(_) => log_info!("Signing token secret generated."),
            Err(e) => log_error!("Failed to store token secret: {}", e),
        }
    }
}

// Export Candid interface
ic_cdk::export_candid!();
