// src/backend/utils/mod.rs
pub mod crypto;
pub mod guards;
pub mod log;
pub mod rate_limit;
pub mod rng;
pub mod sanitize;
pub mod time;
