// src/backend/storage/contract_events.rs
use crate::error::ContractError;
use crate::models::ContractEvent;
use crate::storage::memory::{get_contract_events_memory, Memory};
use crate::storage::storable::{Cbor, StorableString};
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

type StorableEventVec = Cbor<Vec<ContractEvent>>;

thread_local! {
    /// Audit trail: Key = "events:{contract_id}", Value = events in append order
    static EVENTS: RefCell<StableBTreeMap<StorableString, StorableEventVec, Memory>> = RefCell::new(
        StableBTreeMap::init(get_contract_events_memory())
    );
}

fn events_key(contract_id: &str) -> StorableString {
    Cbor(format!("events:{}", contract_id))
}

/// Appends an event. Existing entries are never rewritten.
pub fn append_event(event: ContractEvent) -> Result<(), ContractError> {
    if event.contract_id.is_empty() {
        return Err(ContractError::StorageError(
            "Audit event is missing a contract id".to_string(),
        ));
    }
    EVENTS.with(|map_ref| {
        let mut map = map_ref.borrow_mut();
        let key = events_key(&event.contract_id);
        let mut events = map.get(&key).map(|cbor| cbor.0).unwrap_or_default();
        events.push(event);
        map.insert(key, Cbor(events));
        Ok(())
    })
}

pub fn list_for_contract(contract_id: &str) -> Vec<ContractEvent> {
    EVENTS.with(|map_ref| {
        map_ref
            .borrow()
            .get(&events_key(contract_id))
            .map(|cbor| cbor.0)
            .unwrap_or_default()
    })
}
