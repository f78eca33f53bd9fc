// src/backend/storage/signatures.rs
use crate::models::Signature;
use crate::storage::memory::{get_signatures_memory, Memory};
use crate::storage::storable::{Cbor, StorableString};
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

thread_local! {
    /// Signatures: Key = signature_id
    static SIGNATURES: RefCell<StableBTreeMap<StorableString, Cbor<Signature>, Memory>> = RefCell::new(
        StableBTreeMap::init(get_signatures_memory())
    );
}

pub fn insert_signature(signature: &Signature) {
    SIGNATURES.with(|map_ref| {
        map_ref
            .borrow_mut()
            .insert(Cbor(signature.signature_id.clone()), Cbor(signature.clone()));
    });
}

pub fn list_for_contract(contract_id: &str) -> Vec<Signature> {
    SIGNATURES.with(|map_ref| {
        map_ref
            .borrow()
            .iter()
            .map(|(_key, value)| value.0)
            .filter(|signature| signature.contract_id == contract_id)
            .collect()
    })
}
