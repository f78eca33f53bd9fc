// src/backend/error.rs
use candid::CandidType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(CandidType, Deserialize, Serialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Token-not-found and tamper share wording on purpose.
    #[error("Invalid or expired signing link")]
    InvalidToken,

    #[error("This signing link has expired")]
    TokenExpired,

    #[error("This contract has been cancelled")]
    ContractCancelled,

    #[error("This signing link has already been used")]
    TokenAlreadyUsed,

    #[error("This contract has already been signed")]
    AlreadySigned,

    #[error("Too many attempts. Please try again later.")]
    RateLimited,

    #[error("Password required")]
    PasswordRequired,

    #[error("Invalid password")]
    PasswordInvalid,

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    #[error("Invalid signature encoding")]
    InvalidSignatureEncoding,

    #[error("Name must be at least {0} characters")]
    NameTooShort(usize),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ContractError {
    /// HTTP status used when the error crosses the gateway surface.
    pub fn status_code(&self) -> u16 {
        match self {
            ContractError::AuthenticationRequired
            | ContractError::PasswordRequired
            | ContractError::PasswordInvalid => 401,
            ContractError::Forbidden(_) | ContractError::NotAuthorized(_) => 403,
            ContractError::NotFound(_)
            | ContractError::InvalidToken
            | ContractError::TokenExpired
            | ContractError::ContractCancelled => 404,
            ContractError::InvalidState(_)
            | ContractError::InvalidInput(_)
            | ContractError::TokenAlreadyUsed
            | ContractError::AlreadySigned
            | ContractError::InvalidSignatureFormat
            | ContractError::InvalidSignatureEncoding
            | ContractError::NameTooShort(_) => 400,
            ContractError::PayloadTooLarge(_) => 413,
            ContractError::RateLimited => 429,
            ContractError::StorageError(_)
            | ContractError::InternalError(_) => 500,
        }
    }

    /// True for the password gate failures, which answer with `requiresPassword`.
    pub fn requires_password(&self) -> bool {
        matches!(
            self,
            ContractError::PasswordRequired | ContractError::PasswordInvalid
        )
    }
}
