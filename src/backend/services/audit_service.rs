// src/backend/services/audit_service.rs
// Best-effort audit trail writes. A failed write is logged and swallowed so
// it never undoes the operation being audited.

use crate::models::{ActorType, ContractEvent, ContractEventType, TimestampNs};
use crate::storage::{contract_events, ids};
use crate::utils::log::log_warn;
use serde_json::Value;

pub fn record_event(
    contract_id: &str,
    event_type: ContractEventType,
    actor_type: ActorType,
    actor_id: Option<String>,
    metadata: Value,
    now: TimestampNs,
) {
    let event_id = match ids::next_id("evt") {
        Ok(id) => id,
        Err(e) => {
            log_warn!("Skipping {:?} audit event for {}: {}", event_type, contract_id, e);
            return;
        }
    };
    let event = ContractEvent {
        event_id,
        contract_id: contract_id.to_string(),
        event_type,
        actor_type,
        actor_id,
        metadata: metadata.to_string(),
        created_at: now,
    };
    if let Err(e) = contract_events::append_event(event) {
        log_warn!("Failed to write {:?} audit event for {}: {}", event_type, contract_id, e);
    }
}
