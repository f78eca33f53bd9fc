// src/backend/services/mod.rs
pub mod audit_service;
pub mod contract_service;
pub mod notification_service;
pub mod scheduler;
pub mod signing_service;
pub mod void_service;
pub mod webhook_service;

#[cfg(test)]
pub(crate) mod test_support;
