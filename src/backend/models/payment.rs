// src/backend/models/payment.rs
use crate::models::common::{
    ContractId, Dollars, PaymentId, PaymentStatus, PaymentType, TimestampNs,
};
use candid::CandidType;
use serde::{Deserialize, Serialize};

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub contract_id: ContractId,
    pub amount: Dollars,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    /// Either a payment intent id or the checkout session that produced one.
    pub payment_intent_id: Option<String>,
    pub refund_id: Option<String>,
    pub refunded_amount: Option<Dollars>,
    pub refunded_at: Option<TimestampNs>,
    pub created_at: TimestampNs,
    pub updated_at: TimestampNs,
}

/// Payment totals reported by the void flow.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub total_paid: Dollars,
    pub total_pending: Dollars,
    pub completed_payments_count: u32,
    pub pending_payments_count: u32,
    pub deposit_amount: Dollars,
    pub total_amount: Dollars,
    pub payment_schedule: Option<String>,
}
