// src/backend/storage/payments.rs
use crate::error::ContractError;
use crate::models::{Payment, PaymentStatus, TimestampNs};
use crate::storage::memory::{get_contract_payments_memory, get_payments_memory, Memory};
use crate::storage::storable::{Cbor, StorableString};
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

type StorablePayment = Cbor<Payment>;
type StorablePaymentIds = Cbor<Vec<String>>;

thread_local! {
    /// Payments: Key = payment_id
    static PAYMENTS: RefCell<StableBTreeMap<StorableString, StorablePayment, Memory>> = RefCell::new(
        StableBTreeMap::init(get_payments_memory())
    );

    /// Payment ids per contract, in creation order.
    static CONTRACT_PAYMENTS: RefCell<StableBTreeMap<StorableString, StorablePaymentIds, Memory>> = RefCell::new(
        StableBTreeMap::init(get_contract_payments_memory())
    );
}

/// Inserts or replaces a payment, registering it under its contract on first insert.
pub fn insert_payment(payment: &Payment) -> Option<Payment> {
    let previous = PAYMENTS.with(|map_ref| {
        map_ref
            .borrow_mut()
            .insert(Cbor(payment.payment_id.clone()), Cbor(payment.clone()))
            .map(|prev| prev.0)
    });
    if previous.is_none() {
        CONTRACT_PAYMENTS.with(|map_ref| {
            let mut map = map_ref.borrow_mut();
            let key = Cbor(payment.contract_id.clone());
            let mut ids = map.get(&key).map(|cbor| cbor.0).unwrap_or_default();
            ids.push(payment.payment_id.clone());
            map.insert(key, Cbor(ids));
        });
    }
    previous
}

pub fn get_payment(payment_id: &str) -> Option<Payment> {
    PAYMENTS.with(|map_ref| {
        map_ref
            .borrow()
            .get(&Cbor(payment_id.to_string()))
            .map(|cbor| cbor.0)
    })
}

pub fn list_for_contract(contract_id: &str) -> Vec<Payment> {
    let ids = CONTRACT_PAYMENTS.with(|map_ref| {
        map_ref
            .borrow()
            .get(&Cbor(contract_id.to_string()))
            .map(|cbor| cbor.0)
            .unwrap_or_default()
    });
    ids.iter().filter_map(|id| get_payment(id)).collect()
}

/// Finds the payment whose stored processor reference equals `reference`.
pub fn find_by_processor_reference(contract_id: &str, reference: &str) -> Option<Payment> {
    list_for_contract(contract_id)
        .into_iter()
        .find(|p| p.payment_intent_id.as_deref() == Some(reference))
}

pub fn update_status(
    payment_id: &str,
    status: PaymentStatus,
    now: TimestampNs,
) -> Result<Payment, ContractError> {
    let mut payment = get_payment(payment_id)
        .ok_or_else(|| ContractError::NotFound(format!("Payment {}", payment_id)))?;
    payment.status = status;
    payment.updated_at = now;
    insert_payment(&payment);
    Ok(payment)
}
