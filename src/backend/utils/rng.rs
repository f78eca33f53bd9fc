// src/backend/utils/rng.rs
use crate::error::ContractError;
use crate::utils::log::{log_error, log_info};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::cell::RefCell;

thread_local! {
    // Seeded from the management canister's raw_rand; not persisted.
    static INTERNAL_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

// rand is compiled with the custom getrandom backend on wasm32; the OS
// source is never available inside a canister.
#[cfg(target_arch = "wasm32")]
fn unavailable_getrandom(_buf: &mut [u8]) -> Result<(), getrandom::Error> {
    Err(getrandom::Error::UNSUPPORTED)
}

#[cfg(target_arch = "wasm32")]
getrandom::register_custom_getrandom!(unavailable_getrandom);

pub fn seed_internal_rng(seed: [u8; 32]) {
    INTERNAL_RNG.with(|rng| {
        *rng.borrow_mut() = Some(StdRng::from_seed(seed));
    });
}

/// Initializes the thread-local RNG from `raw_rand`.
/// Called from init and post_upgrade via a zero-delay timer.
pub async fn initialize_internal_rng() -> Result<(), ContractError> {
    let bytes = fetch_raw_rand().await?;
    let seed: [u8; 32] = bytes
        .get(..32)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            ContractError::InternalError("raw_rand returned insufficient bytes for seed".to_string())
        })?;
    seed_internal_rng(seed);
    log_info!("Internal RNG initialized");
    Ok(())
}

pub async fn fetch_raw_rand() -> Result<Vec<u8>, ContractError> {
    let (bytes,) = ic_cdk::api::management_canister::main::raw_rand()
        .await
        .map_err(|(code, msg)| {
            log_error!("raw_rand failed: {:?} {}", code, msg);
            ContractError::InternalError(format!("raw_rand failed: {:?} {}", code, msg))
        })?;
    Ok(bytes)
}

pub fn random_bytes(num_bytes: usize) -> Result<Vec<u8>, ContractError> {
    INTERNAL_RNG.with(|rng| {
        let mut borrowed = rng.borrow_mut();
        let rng = borrowed.as_mut().ok_or_else(|| {
            ContractError::InternalError("Random generator not initialized yet".to_string())
        })?;
        let mut buf = vec![0u8; num_bytes];
        rng.fill_bytes(&mut buf);
        Ok(buf)
    })
}

/// 32 random bytes, hex-encoded: the bearer token embedded in signing links.
pub fn generate_signing_token() -> Result<String, ContractError> {
    Ok(hex::encode(random_bytes(32)?))
}
