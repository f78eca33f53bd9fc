pub mod common;
pub mod contract;
pub mod contract_event;
pub mod init;
pub mod party;
pub mod payment;
pub mod refund;
pub mod signature;
pub mod signing_attempt;

// Re-export common types/enums for easier access
pub use common::*;
pub use contract::{Contract, ContractView};
pub use contract_event::{ContractEvent, ContractEventType};
pub use init::{ConfigUpdate, InitArgs};
pub use party::{Client, ClientView, Contractor};
pub use payment::{Payment, PaymentInfo};
pub use refund::{RefundResult, RefundStatus};
pub use signature::Signature;
pub use signing_attempt::SigningAttempt;
