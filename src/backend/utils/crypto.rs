// src/backend/utils/crypto.rs
// Keyed hashing and constant-time comparisons for tokens, passwords and
// processor webhooks.

use crate::error::ContractError;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a processor webhook signature, in seconds.
pub const WEBHOOK_TOLERANCE_SECS: u64 = 300;

fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    // HMAC accepts keys of any length, including empty.
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Compares two byte strings without short-circuiting on the first mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Keyed hash stored in place of the raw signing token.
pub fn hash_signing_token(secret: &str, token: &str) -> String {
    hmac_sha256_hex(secret.as_bytes(), token.as_bytes())
}

pub fn verify_signing_token(secret: &str, token: &str, stored_hash: &str) -> bool {
    let computed = hash_signing_token(secret, token);
    constant_time_eq(computed.as_bytes(), stored_hash.as_bytes())
}

/// Produces `"{salt_hex}${hmac_hex}"`.
pub fn hash_password(password: &str, salt: &[u8]) -> String {
    format!(
        "{}${}",
        hex::encode(salt),
        hmac_sha256_hex(salt, password.as_bytes())
    )
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, expected)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let computed = hmac_sha256_hex(&salt, password.as_bytes());
    constant_time_eq(computed.as_bytes(), expected.as_bytes())
}

/// Calculates the SHA256 hash of byte data and returns it as a hex string.
pub fn calculate_sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Verifies a `t=<unix>,v1=<hex>` webhook signature header.
///
/// Returns `Ok(false)` for a well-formed header that does not verify or is
/// outside the tolerance, and an error when the header cannot be parsed.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_secs: u64,
) -> Result<bool, ContractError> {
    let mut timestamp: Option<u64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| {
                    ContractError::InvalidInput("Malformed signature timestamp".to_string())
                })?);
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ContractError::InvalidInput("Signature header is missing a timestamp".to_string())
    })?;
    if signatures.is_empty() {
        return Err(ContractError::InvalidInput(
            "Signature header is missing a v1 signature".to_string(),
        ));
    }
    if now_secs.abs_diff(timestamp) > WEBHOOK_TOLERANCE_SECS {
        return Ok(false);
    }

    let mut signed_payload = format!("{}.", timestamp).into_bytes();
    signed_payload.extend_from_slice(payload);
    let expected = hmac_sha256_hex(secret.as_bytes(), &signed_payload);
    Ok(signatures
        .iter()
        .any(|candidate| constant_time_eq(expected.as_bytes(), candidate.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_keyed() {
        let a = hash_signing_token("secret-a", "tok");
        let b = hash_signing_token("secret-b", "tok");
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(verify_signing_token("secret-a", "tok", &a));
        assert!(!verify_signing_token("secret-a", "tok", &b));
        assert!(!verify_signing_token("secret-a", "tok", "short"));
    }

    #[test]
    fn password_hash_verifies_only_the_right_password() {
        let stored = hash_password("hunter22", &[7u8; 16]);
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
        assert!(!verify_password("hunter22", "no-dollar-sign"));
        assert!(!verify_password("hunter22", "zz$abcd"));
    }

    fn sign(payload: &[u8], secret: &str, ts: u64) -> String {
        let mut signed = format!("{}.", ts).into_bytes();
        signed.extend_from_slice(payload);
        format!("t={},v1={}", ts, hmac_sha256_hex(secret.as_bytes(), &signed))
    }

    #[test]
    fn webhook_signature_checks() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, "whsec_1", 1_000);
        assert_eq!(verify_webhook_signature(payload, &header, "whsec_1", 1_010), Ok(true));
        assert_eq!(verify_webhook_signature(payload, &header, "whsec_2", 1_010), Ok(false));
        assert_eq!(verify_webhook_signature(b"{}", &header, "whsec_1", 1_010), Ok(false));
        // Outside the tolerance.
        assert_eq!(verify_webhook_signature(payload, &header, "whsec_1", 2_000), Ok(false));
        assert!(verify_webhook_signature(payload, "v1=abc", "whsec_1", 1_000).is_err());
        assert!(verify_webhook_signature(payload, "t=1000", "whsec_1", 1_000).is_err());
        assert!(verify_webhook_signature(payload, "", "whsec_1", 1_000).is_err());
    }
}
