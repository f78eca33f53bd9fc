// src/backend/models/init.rs
use crate::storage::config::ServiceConfig;
use candid::{CandidType, Principal};
use serde::Deserialize;

/// Partial configuration; `None` leaves the current value untouched.
#[derive(CandidType, Deserialize, Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub admin: Option<Principal>,
    pub token_secret: Option<String>,
    pub rate_limit_window_minutes: Option<u64>,
    pub rate_limit_max_attempts: Option<u32>,
    pub signing_token_ttl_days: Option<u64>,
    pub app_base_url: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub currency: Option<String>,
    pub email_api_key: Option<String>,
    pub email_from: Option<String>,
    pub outcall_cycles: Option<u128>,
}

impl ConfigUpdate {
    pub fn apply_to(self, config: &mut ServiceConfig) {
        if let Some(v) = self.admin {
            config.admin = v;
        }
        if let Some(v) = self.token_secret {
            config.token_secret = v;
        }
        if let Some(v) = self.rate_limit_window_minutes {
            config.rate_limit_window_minutes = v;
        }
        if let Some(v) = self.rate_limit_max_attempts {
            config.rate_limit_max_attempts = v;
        }
        if let Some(v) = self.signing_token_ttl_days {
            config.signing_token_ttl_days = v;
        }
        if let Some(v) = self.app_base_url {
            config.app_base_url = v;
        }
        if let Some(v) = self.stripe_secret_key {
            config.stripe_secret_key = v;
        }
        if let Some(v) = self.stripe_webhook_secret {
            config.stripe_webhook_secret = v;
        }
        if let Some(v) = self.currency {
            config.currency = v.to_ascii_lowercase();
        }
        if let Some(v) = self.email_api_key {
            config.email_api_key = v;
        }
        if let Some(v) = self.email_from {
            config.email_from = v;
        }
        if let Some(v) = self.outcall_cycles {
            config.outcall_cycles = v;
        }
    }
}

#[derive(CandidType, Deserialize, Debug)]
pub struct InitArgs {
    pub admin_principal: Principal,
    pub config: Option<ConfigUpdate>,
}
