// src/backend/utils/rate_limit.rs
// Sliding-window limiter for public signing-link requests, keyed by client IP.
use crate::error::ContractError;
use crate::models::{ContractId, SigningAttempt, TimestampNs, NANOS_PER_MINUTE};
use crate::storage::config::ServiceConfig;
use crate::storage::signing_attempts;
use crate::utils::log::log_warn;

/// Settings for a single check, taken from the service config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window_ns: u64,
    pub max_attempts: u32,
}

impl RateLimitPolicy {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            window_ns: config.rate_limit_window_minutes.saturating_mul(NANOS_PER_MINUTE),
            max_attempts: config.rate_limit_max_attempts,
        }
    }

    pub fn window_start(&self, now: TimestampNs) -> TimestampNs {
        now.saturating_sub(self.window_ns)
    }
}

/// Rejects when `ip_address` already has `max_attempts` attempts in the window.
/// A rejected request is itself recorded as a failed attempt.
pub fn check_rate_limit(
    policy: &RateLimitPolicy,
    ip_address: &str,
    contract_id: Option<&ContractId>,
    now: TimestampNs,
) -> Result<(), ContractError> {
    let recent = signing_attempts::count_since(ip_address, policy.window_start(now));
    if recent >= policy.max_attempts {
        log_warn!(
            "🚦 Rate limit hit for {} ({} attempts in window)",
            ip_address,
            recent
        );
        record_attempt(policy, ip_address, contract_id, false, now);
        return Err(ContractError::RateLimited);
    }
    Ok(())
}

pub fn record_attempt(
    policy: &RateLimitPolicy,
    ip_address: &str,
    contract_id: Option<&ContractId>,
    success: bool,
    now: TimestampNs,
) {
    signing_attempts::record_attempt(
        SigningAttempt {
            ip_address: ip_address.to_string(),
            contract_id: contract_id.cloned(),
            success,
            timestamp: now,
        },
        policy.window_start(now),
    );
}
