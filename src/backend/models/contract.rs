// src/backend/models/contract.rs
use crate::models::common::{
    ClientId, CompanyId, ContractId, ContractStatus, Dollars, PrincipalId, TimestampNs,
};
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// A contract sent by a contractor to a client for signature.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Contract {
    pub contract_id: ContractId,
    pub contractor_id: PrincipalId,
    pub company_id: CompanyId,
    pub client_id: ClientId,
    pub title: String,
    pub content: String,
    pub status: ContractStatus,
    /// Raw token kept only for contracts sent before tokens were hashed.
    pub signing_token: Option<String>,
    pub signing_token_hash: Option<String>,
    pub signing_token_expires_at: Option<TimestampNs>,
    pub signing_token_used_at: Option<TimestampNs>,
    pub password_hash: Option<String>,
    pub deposit_amount: Dollars,
    pub total_amount: Dollars,
    /// Free-form JSON; may carry `paymentSchedule` and `paymentScheduleConfig`.
    pub field_values: Option<String>,
    pub contractor_signed_at: Option<TimestampNs>,
    pub signed_at: Option<TimestampNs>,
    pub sent_at: Option<TimestampNs>,
    pub voided_at: Option<TimestampNs>,
    pub created_at: TimestampNs,
    pub updated_at: TimestampNs,
}

impl Contract {
    pub fn both_parties_signed(&self) -> bool {
        self.contractor_signed_at.is_some() && self.signed_at.is_some()
    }

    pub fn is_password_protected(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }

    pub fn field_values_json(&self) -> Option<serde_json::Value> {
        self.field_values
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// The `paymentSchedule` tag and its nested config, when present.
    pub fn payment_schedule(&self) -> (Option<String>, Option<serde_json::Value>) {
        let Some(values) = self.field_values_json() else {
            return (None, None);
        };
        let schedule = values
            .get("paymentSchedule")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let config = values.get("paymentScheduleConfig").cloned();
        (schedule, config)
    }
}

/// Client-facing projection. Never carries token or password material.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractView {
    pub id: ContractId,
    pub title: String,
    pub content: String,
    pub status: ContractStatus,
    pub deposit_amount: Dollars,
    pub total_amount: Dollars,
    pub field_values: Option<String>,
    pub contractor_signed_at: Option<TimestampNs>,
    pub signed_at: Option<TimestampNs>,
    pub signing_token_expires_at: Option<TimestampNs>,
}

impl From<&Contract> for ContractView {
    fn from(contract: &Contract) -> Self {
        Self {
            id: contract.contract_id.clone(),
            title: contract.title.clone(),
            content: contract.content.clone(),
            status: contract.status,
            deposit_amount: contract.deposit_amount,
            total_amount: contract.total_amount,
            field_values: contract.field_values.clone(),
            contractor_signed_at: contract.contractor_signed_at,
            signed_at: contract.signed_at,
            signing_token_expires_at: contract.signing_token_expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candid::Principal;

    fn contract_with_fields(fields: Option<&str>) -> Contract {
        Contract {
            contract_id: "con_1".into(),
            contractor_id: Principal::anonymous(),
            company_id: "cmp_1".into(),
            client_id: "cli_1".into(),
            title: "Kitchen remodel".into(),
            content: "Scope".into(),
            status: ContractStatus::Sent,
            signing_token: None,
            signing_token_hash: Some("abc".into()),
            signing_token_expires_at: Some(10),
            signing_token_used_at: None,
            password_hash: Some("salt$hash".into()),
            deposit_amount: 100.0,
            total_amount: 500.0,
            field_values: fields.map(str::to_string),
            contractor_signed_at: None,
            signed_at: None,
            sent_at: None,
            voided_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn reads_payment_schedule_from_field_values() {
        let contract = contract_with_fields(Some(
            r#"{"paymentSchedule":"incremental","paymentScheduleConfig":{"installments":3}}"#,
        ));
        let (schedule, config) = contract.payment_schedule();
        assert_eq!(schedule.as_deref(), Some("incremental"));
        assert_eq!(config.unwrap()["installments"], 3);
    }

    #[test]
    fn malformed_field_values_yield_no_schedule() {
        let contract = contract_with_fields(Some("not json"));
        assert_eq!(contract.payment_schedule(), (None, None));
    }

    #[test]
    fn view_omits_secrets() {
        let contract = contract_with_fields(None);
        let json = serde_json::to_string(&ContractView::from(&contract)).unwrap();
        assert!(!json.contains("salt$hash"));
        assert!(!json.contains("signingTokenHash"));
        assert!(json.contains("depositAmount"));
    }
}
