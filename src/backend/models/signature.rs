// src/backend/models/signature.rs
use crate::models::common::{ContractId, SignatureId, TimestampNs};
use candid::CandidType;
use serde::{Deserialize, Serialize};

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub signature_id: SignatureId,
    pub contract_id: ContractId,
    pub full_name: String,
    pub signature_data_url: Option<String>,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub signed_at: TimestampNs,
}
