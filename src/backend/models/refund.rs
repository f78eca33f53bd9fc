// src/backend/models/refund.rs
use crate::models::common::{Dollars, PaymentId};
use candid::CandidType;
use serde::{Deserialize, Serialize};

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Processed,
    AlreadyRefunded,
    FeeExceedsPayment,
    IntentNotFound,
    NotRefundable,
    ManualFollowUpRequired,
    Failed,
    Kept,
    Manual,
}

impl RefundStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RefundStatus::IntentNotFound | RefundStatus::NotRefundable | RefundStatus::Failed
        )
    }
}

/// Outcome of one payment (or one aggregate entry) during a void.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefundResult {
    pub payment_id: PaymentId,
    pub original_amount: Dollars,
    pub actual_refund_amount: Dollars,
    pub refund_id: Option<String>,
    pub status: RefundStatus,
    /// Processor-side refund status, e.g. `succeeded` or `pending`.
    pub processor_status: Option<String>,
    pub payment_type: String,
    pub cancellation_fee_applied: Dollars,
    pub error: Option<String>,
}

impl RefundResult {
    pub fn for_payment(payment_id: &str, payment_type: &str, original_amount: Dollars) -> Self {
        Self {
            payment_id: payment_id.to_string(),
            original_amount,
            actual_refund_amount: 0.0,
            refund_id: None,
            status: RefundStatus::Failed,
            processor_status: None,
            payment_type: payment_type.to_string(),
            cancellation_fee_applied: 0.0,
            error: None,
        }
    }

    pub fn with_status(mut self, status: RefundStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_error(mut self, status: RefundStatus, error: impl Into<String>) -> Self {
        self.status = status;
        self.error = Some(error.into());
        self
    }
}
