// src/backend/services/scheduler.rs
// Periodic maintenance, run from an hourly timer.

use crate::error::ContractError;
use crate::metrics;
use crate::models::TimestampNs;
use crate::storage::config::get_config;
use crate::storage::signing_attempts;
use crate::utils::log::log_info;
use crate::utils::rate_limit::RateLimitPolicy;

/// Performs hourly maintenance tasks.
pub fn perform_maintenance(now: TimestampNs) -> Result<(), ContractError> {
    log_info!("⚙️ SCHEDULER: Starting maintenance at {}", now);

    // 1. Drop signing attempts that can no longer count against a window
    let pruned = prune_signing_attempts(now);

    metrics::record(|m| m.maintenance_last_run = Some(now));
    log_info!(
        "⚙️ SCHEDULER: Maintenance completed ({} signing attempts pruned).",
        pruned
    );
    Ok(())
}

pub fn prune_signing_attempts(now: TimestampNs) -> usize {
    let policy = RateLimitPolicy::from_config(&get_config());
    signing_attempts::prune_before(policy.window_start(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SigningAttempt, NANOS_PER_MINUTE};

    #[test]
    fn maintenance_prunes_attempts_outside_the_window() {
        let now = 600 * NANOS_PER_MINUTE;
        for (ip, at) in [("1.2.3.4", now - 60 * NANOS_PER_MINUTE), ("1.2.3.4", now - NANOS_PER_MINUTE)] {
            signing_attempts::record_attempt(
                SigningAttempt {
                    ip_address: ip.to_string(),
                    contract_id: None,
                    success: false,
                    timestamp: at,
                },
                0,
            );
        }
        perform_maintenance(now).unwrap();
        assert_eq!(signing_attempts::count_since("1.2.3.4", 0), 1);
        assert_eq!(metrics::snapshot().maintenance_last_run, Some(now));
    }
}
