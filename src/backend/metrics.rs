// src/backend/metrics.rs
use crate::models::RefundResult;
use crate::storage::metrics::{get_metrics, update_metrics};
use crate::utils::log::log_warn;
use candid::CandidType;
use serde::{Deserialize, Serialize};

#[derive(CandidType, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceMetrics {
    pub contracts_created: u64,
    pub contracts_sent: u64,
    pub contracts_signed: u64,
    pub contracts_voided: u64,
    pub signing_views: u64,
    pub signing_rejections: u64,
    pub rate_limited_requests: u64,
    pub refunds_processed: u64,
    pub refunds_failed: u64,
    pub webhooks_processed: u64,
    pub maintenance_last_run: Option<u64>,
}

/// Applies a metrics update; failures are logged, never surfaced.
pub fn record<F>(update_fn: F)
where
    F: FnOnce(&mut ServiceMetrics),
{
    if let Err(e) = update_metrics(update_fn) {
        log_warn!("Failed to update metrics: {}", e);
    }
}

pub fn record_refund_results(results: &[RefundResult]) {
    let processed = results
        .iter()
        .filter(|r| r.status == crate::models::RefundStatus::Processed)
        .count() as u64;
    let failed = results.iter().filter(|r| r.status.is_failure()).count() as u64;
    record(|m| {
        m.refunds_processed = m.refunds_processed.saturating_add(processed);
        m.refunds_failed = m.refunds_failed.saturating_add(failed);
    });
}

pub fn snapshot() -> ServiceMetrics {
    get_metrics()
}
