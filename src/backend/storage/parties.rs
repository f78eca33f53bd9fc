// src/backend/storage/parties.rs
use crate::models::{Client, Contractor, PrincipalId};
use crate::storage::memory::{get_clients_memory, get_contractors_memory, Memory};
use crate::storage::storable::{Cbor, StorableString};
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

thread_local! {
    /// Contractors: Key = principal text
    static CONTRACTORS: RefCell<StableBTreeMap<StorableString, Cbor<Contractor>, Memory>> = RefCell::new(
        StableBTreeMap::init(get_contractors_memory())
    );

    /// Clients: Key = client_id
    static CLIENTS: RefCell<StableBTreeMap<StorableString, Cbor<Client>, Memory>> = RefCell::new(
        StableBTreeMap::init(get_clients_memory())
    );
}

pub fn insert_contractor(contractor: &Contractor) -> Option<Contractor> {
    CONTRACTORS.with(|map_ref| {
        map_ref
            .borrow_mut()
            .insert(Cbor(contractor.contractor_id.to_text()), Cbor(contractor.clone()))
            .map(|prev| prev.0)
    })
}

pub fn get_contractor(contractor_id: &PrincipalId) -> Option<Contractor> {
    CONTRACTORS.with(|map_ref| {
        map_ref
            .borrow()
            .get(&Cbor(contractor_id.to_text()))
            .map(|cbor| cbor.0)
    })
}

pub fn insert_client(client: &Client) -> Option<Client> {
    CLIENTS.with(|map_ref| {
        map_ref
            .borrow_mut()
            .insert(Cbor(client.client_id.clone()), Cbor(client.clone()))
            .map(|prev| prev.0)
    })
}

pub fn get_client(client_id: &str) -> Option<Client> {
    CLIENTS.with(|map_ref| {
        map_ref
            .borrow()
            .get(&Cbor(client_id.to_string()))
            .map(|cbor| cbor.0)
    })
}
