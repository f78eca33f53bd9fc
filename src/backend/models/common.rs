// src/backend/models/common.rs
use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};

pub type ContractId = String;
pub type PaymentId = String;
pub type ClientId = String;
pub type CompanyId = String;
pub type SignatureId = String;
pub type EventId = String;
pub type PrincipalId = Principal;

pub type TimestampNs = u64; // Nanoseconds since epoch
pub type Dollars = f64;

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;
pub const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;
pub const NANOS_PER_DAY: u64 = 24 * 60 * NANOS_PER_MINUTE;

/// Tolerance for comparing stored amounts against computed ones.
pub const AMOUNT_EPSILON: Dollars = 0.01;

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Ready,
    Sent,
    Signed,
    Paid,
    Completed,
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Ready => "ready",
            ContractStatus::Sent => "sent",
            ContractStatus::Signed => "signed",
            ContractStatus::Paid => "paid",
            ContractStatus::Completed => "completed",
            ContractStatus::Cancelled => "cancelled",
        }
    }

    /// Document finalized by the client; a used token may still view it.
    pub fn is_finalized(&self) -> bool {
        matches!(
            self,
            ContractStatus::Signed | ContractStatus::Paid | ContractStatus::Completed
        )
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Deposit,
    FullPayment,
    IncrementalPayment,
    RemainingBalance,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Deposit => "deposit",
            PaymentType::FullPayment => "full_payment",
            PaymentType::IncrementalPayment => "incremental_payment",
            PaymentType::RemainingBalance => "remaining_balance",
        }
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefundOption {
    #[default]
    Automatic,
    Manual,
    Keep,
}

impl RefundOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundOption::Automatic => "automatic",
            RefundOption::Manual => "manual",
            RefundOption::Keep => "keep",
        }
    }
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Contractor,
    Client,
    System,
    Processor,
}

/// Converts decimal dollars to processor cents. Rounding happens only here.
pub fn to_cents(amount: Dollars) -> u64 {
    if amount <= 0.0 {
        return 0;
    }
    (amount * 100.0).round() as u64
}

pub fn from_cents(cents: u64) -> Dollars {
    cents as Dollars / 100.0
}

pub fn amounts_match(a: Dollars, b: Dollars) -> bool {
    (a - b).abs() < AMOUNT_EPSILON
}
