// src/backend/storage/config.rs
use crate::storage::memory::{get_config_memory, Memory};
use crate::storage::storable::Cbor;
use candid::{CandidType, Principal};
use ic_stable_structures::StableCell;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

pub const DEFAULT_RATE_LIMIT_WINDOW_MINUTES: u64 = 15;
pub const DEFAULT_RATE_LIMIT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_SIGNING_TOKEN_TTL_DAYS: u64 = 30;
pub const DEFAULT_OUTCALL_CYCLES: u128 = 3_000_000_000;

/// Runtime configuration, set at install and adjustable by the admin.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ServiceConfig {
    pub admin: Principal,
    /// Key for the signing-token HMAC. Seeded from `raw_rand` when empty.
    pub token_secret: String,
    pub rate_limit_window_minutes: u64,
    pub rate_limit_max_attempts: u32,
    pub signing_token_ttl_days: u64,
    /// Public origin used to build signing and checkout return URLs.
    pub app_base_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub currency: String,
    pub email_api_key: String,
    pub email_from: String,
    pub outcall_cycles: u128,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            admin: Principal::management_canister(),
            token_secret: String::new(),
            rate_limit_window_minutes: DEFAULT_RATE_LIMIT_WINDOW_MINUTES,
            rate_limit_max_attempts: DEFAULT_RATE_LIMIT_MAX_ATTEMPTS,
            signing_token_ttl_days: DEFAULT_SIGNING_TOKEN_TTL_DAYS,
            app_base_url: "https://pay2start.app".to_string(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
            currency: "usd".to_string(),
            email_api_key: String::new(),
            email_from: "Pay2Start <contracts@pay2start.app>".to_string(),
            outcall_cycles: DEFAULT_OUTCALL_CYCLES,
        }
    }
}

impl ServiceConfig {
    /// Copy with secrets blanked, for the admin read endpoint.
    pub fn redacted(&self) -> Self {
        let blank = |s: &String| if s.is_empty() { String::new() } else { "***".to_string() };
        Self {
            token_secret: blank(&self.token_secret),
            stripe_secret_key: blank(&self.stripe_secret_key),
            stripe_webhook_secret: blank(&self.stripe_webhook_secret),
            email_api_key: blank(&self.email_api_key),
            ..self.clone()
        }
    }
}

thread_local! {
    static CONFIG: RefCell<StableCell<Cbor<ServiceConfig>, Memory>> = RefCell::new(
        StableCell::init(get_config_memory(), Cbor(ServiceConfig::default()))
            .expect("Failed to initialize config stable cell")
    );
}

pub fn get_config() -> ServiceConfig {
    CONFIG.with(|cell| cell.borrow().get().0.clone())
}

pub fn set_config(config: ServiceConfig) -> Result<(), String> {
    CONFIG.with(|cell| {
        cell.borrow_mut()
            .set(Cbor(config))
            .map(|_| ())
            .map_err(|e| format!("Failed to set config: {:?}", e))
    })
}

/// Applies `update_fn` to the stored config and persists the result.
pub fn update_config<F>(update_fn: F) -> Result<ServiceConfig, String>
where
    F: FnOnce(&mut ServiceConfig),
{
    let mut config = get_config();
    update_fn(&mut config);
    set_config(config.clone())?;
    Ok(config)
}
