// src/backend/storage/signing_attempts.rs
use crate::models::{SigningAttempt, TimestampNs};
use crate::storage::memory::{get_signing_attempts_memory, Memory};
use crate::storage::storable::{Cbor, StorableString};
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

type StorableAttempts = Cbor<Vec<SigningAttempt>>;

thread_local! {
    /// Signing attempts per requesting IP. Entries older than the window are
    /// dropped on append and by the maintenance timer.
    static ATTEMPTS: RefCell<StableBTreeMap<StorableString, StorableAttempts, Memory>> = RefCell::new(
        StableBTreeMap::init(get_signing_attempts_memory())
    );
}

/// Appends an attempt, discarding anything for the same IP older than `keep_since`.
pub fn record_attempt(attempt: SigningAttempt, keep_since: TimestampNs) {
    ATTEMPTS.with(|map_ref| {
        let mut map = map_ref.borrow_mut();
        let key = Cbor(attempt.ip_address.clone());
        let mut attempts = map.get(&key).map(|cbor| cbor.0).unwrap_or_default();
        attempts.retain(|a| a.timestamp >= keep_since);
        attempts.push(attempt);
        map.insert(key, Cbor(attempts));
    });
}

/// Number of attempts from `ip_address` at or after `since`.
pub fn count_since(ip_address: &str, since: TimestampNs) -> u32 {
    ATTEMPTS.with(|map_ref| {
        map_ref
            .borrow()
            .get(&Cbor(ip_address.to_string()))
            .map(|cbor| cbor.0.iter().filter(|a| a.timestamp >= since).count() as u32)
            .unwrap_or(0)
    })
}

/// Drops every attempt older than `cutoff`. Returns how many were removed.
pub fn prune_before(cutoff: TimestampNs) -> usize {
    ATTEMPTS.with(|map_ref| {
        let mut map = map_ref.borrow_mut();
        let entries: Vec<(StorableString, Vec<SigningAttempt>)> =
            map.iter().map(|(k, v)| (k, v.0)).collect();
        let mut removed = 0;
        for (key, attempts) in entries {
            let before = attempts.len();
            let kept: Vec<SigningAttempt> =
                attempts.into_iter().filter(|a| a.timestamp >= cutoff).collect();
            removed += before - kept.len();
            if kept.is_empty() {
                map.remove(&key);
            } else if kept.len() != before {
                map.insert(key, Cbor(kept));
            }
        }
        removed
    })
}
