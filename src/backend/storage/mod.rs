// src/backend/storage/mod.rs
// Stable memory persistence on ic-stable-structures.

pub mod config;
pub mod contract_events;
pub mod contracts;
pub mod ids;
pub mod memory;
pub mod metrics;
pub mod parties;
pub mod payments;
pub mod signatures;
pub mod signing_attempts;
pub mod storable;
pub mod webhook_events;

pub use memory::Memory;
pub use storable::{Cbor, StorableString};
