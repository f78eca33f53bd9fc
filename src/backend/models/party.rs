// src/backend/models/party.rs
use crate::models::common::{ClientId, CompanyId, PrincipalId, TimestampNs};
use candid::CandidType;
use serde::{Deserialize, Serialize};

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Contractor {
    pub contractor_id: PrincipalId,
    pub company_id: CompanyId,
    pub display_name: String,
    pub email: String,
    pub created_at: TimestampNs,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Client {
    pub client_id: ClientId,
    pub company_id: CompanyId,
    pub name: String,
    pub email: String,
    pub created_at: TimestampNs,
}

/// Client fields exposed on the public signing page.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    pub name: String,
    pub email: String,
}

impl From<&Client> for ClientView {
    fn from(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            email: client.email.clone(),
        }
    }
}
