// src/backend/storage/webhook_events.rs
use crate::models::TimestampNs;
use crate::storage::memory::{get_webhook_events_memory, Memory};
use crate::storage::storable::{Cbor, StorableString};
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

thread_local! {
    /// Processor event ids already handled -> time handled
    static PROCESSED: RefCell<StableBTreeMap<StorableString, u64, Memory>> = RefCell::new(
        StableBTreeMap::init(get_webhook_events_memory())
    );
}

pub fn is_processed(event_id: &str) -> bool {
    PROCESSED.with(|map_ref| map_ref.borrow().contains_key(&Cbor(event_id.to_string())))
}

pub fn mark_processed(event_id: &str, now: TimestampNs) {
    PROCESSED.with(|map_ref| {
        map_ref
            .borrow_mut()
            .insert(Cbor(event_id.to_string()), now);
    });
}
