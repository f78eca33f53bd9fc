// src/backend/adapter/mod.rs
pub mod email_adapter;
pub mod stripe_adapter;
