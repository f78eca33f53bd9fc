// src/backend/models/signing_attempt.rs
use crate::models::common::{ContractId, TimestampNs};
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Counted per IP inside the rate-limit window; never mutated.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SigningAttempt {
    pub ip_address: String,
    pub contract_id: Option<ContractId>,
    pub success: bool,
    pub timestamp: TimestampNs,
}
