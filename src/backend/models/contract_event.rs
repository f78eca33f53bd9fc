// src/backend/models/contract_event.rs
use crate::models::common::{ActorType, ContractId, EventId, TimestampNs};
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Append-only audit record for a contract.
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContractEvent {
    pub event_id: EventId,
    pub contract_id: ContractId,
    pub event_type: ContractEventType,
    pub actor_type: ActorType,
    /// Principal text, client id, or processor event id depending on `actor_type`.
    pub actor_id: Option<String>,
    /// JSON document with event-specific details.
    pub metadata: String,
    pub created_at: TimestampNs,
}

#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ContractEventType {
    ContractCreated,
    ContractSent,
    ContractViewed,
    ContractSigned,
    ContractVoided,
    PaymentCompleted,
    PaymentExpired,
}
