// src/backend/utils/guards.rs
use crate::error::ContractError;
use crate::models::PrincipalId;
use crate::storage::config::get_config;
use candid::Principal;

/// Rejects the anonymous principal.
pub fn require_authenticated(caller: PrincipalId) -> Result<(), ContractError> {
    if caller == Principal::anonymous() {
        Err(ContractError::AuthenticationRequired)
    } else {
        Ok(())
    }
}

/// Checks if the caller is the configured admin principal.
pub fn check_admin(caller: PrincipalId) -> Result<(), ContractError> {
    if caller == get_config().admin {
        Ok(())
    } else {
        Err(ContractError::NotAuthorized(
            "Caller is not the configured admin".to_string(),
        ))
    }
}

/// Guard for `#[update(guard = ...)]` admin endpoints.
pub fn admin_guard() -> Result<(), String> {
    check_admin(ic_cdk::caller()).map_err(|e| e.to_string())
}
