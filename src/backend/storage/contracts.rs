// src/backend/storage/contracts.rs
use crate::error::ContractError;
use crate::models::{Contract, ContractId, ContractStatus, TimestampNs};
use crate::storage::memory::{
    get_contracts_memory, get_raw_token_index_memory, get_token_hash_index_memory, Memory,
};
use crate::storage::storable::{Cbor, StorableString};
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

type StorableContract = Cbor<Contract>;

thread_local! {
    /// Contracts: Key = contract_id
    static CONTRACTS: RefCell<StableBTreeMap<StorableString, StorableContract, Memory>> = RefCell::new(
        StableBTreeMap::init(get_contracts_memory())
    );

    /// Secondary index: keyed token hash -> contract_id
    static TOKEN_HASH_INDEX: RefCell<StableBTreeMap<StorableString, StorableString, Memory>> = RefCell::new(
        StableBTreeMap::init(get_token_hash_index_memory())
    );

    /// Legacy index: raw token -> contract_id, for contracts sent before hashing
    static RAW_TOKEN_INDEX: RefCell<StableBTreeMap<StorableString, StorableString, Memory>> = RefCell::new(
        StableBTreeMap::init(get_raw_token_index_memory())
    );
}

/// Inserts or replaces a contract and keeps both token indexes in step.
pub fn insert_contract(contract: &Contract) -> Option<Contract> {
    let previous = CONTRACTS.with(|map_ref| {
        map_ref
            .borrow_mut()
            .insert(Cbor(contract.contract_id.clone()), Cbor(contract.clone()))
            .map(|prev| prev.0)
    });

    if let Some(prev) = &previous {
        if prev.signing_token_hash != contract.signing_token_hash {
            if let Some(old_hash) = &prev.signing_token_hash {
                TOKEN_HASH_INDEX.with(|idx| idx.borrow_mut().remove(&Cbor(old_hash.clone())));
            }
        }
        if prev.signing_token != contract.signing_token {
            if let Some(old_token) = &prev.signing_token {
                RAW_TOKEN_INDEX.with(|idx| idx.borrow_mut().remove(&Cbor(old_token.clone())));
            }
        }
    }

    if let Some(hash) = &contract.signing_token_hash {
        index_token_hash(hash, &contract.contract_id);
    }
    if let Some(token) = &contract.signing_token {
        RAW_TOKEN_INDEX.with(|idx| {
            idx.borrow_mut()
                .insert(Cbor(token.clone()), Cbor(contract.contract_id.clone()))
        });
    }
    previous
}

/// Points a token hash at a contract.
pub fn index_token_hash(hash: &str, contract_id: &ContractId) {
    TOKEN_HASH_INDEX.with(|idx| {
        idx.borrow_mut()
            .insert(Cbor(hash.to_string()), Cbor(contract_id.clone()))
    });
}

pub fn get_contract(contract_id: &str) -> Option<Contract> {
    CONTRACTS.with(|map_ref| {
        map_ref
            .borrow()
            .get(&Cbor(contract_id.to_string()))
            .map(|cbor| cbor.0)
    })
}

/// Legacy lookup by the raw token string.
pub fn find_by_raw_token(token: &str) -> Option<Contract> {
    let contract_id = RAW_TOKEN_INDEX.with(|idx| idx.borrow().get(&Cbor(token.to_string())))?;
    get_contract(&contract_id.0)
}

pub fn find_by_token_hash(hash: &str) -> Option<Contract> {
    let contract_id = TOKEN_HASH_INDEX.with(|idx| idx.borrow().get(&Cbor(hash.to_string())))?;
    get_contract(&contract_id.0)
}

/// Moves a contract to `signed`, stamping `signed_at` and `signing_token_used_at`
/// in the same write. Refuses if the token was already consumed.
pub fn mark_signed(contract_id: &str, now: TimestampNs) -> Result<Contract, ContractError> {
    let mut contract = get_contract(contract_id)
        .ok_or_else(|| ContractError::NotFound("Contract".to_string()))?;
    if contract.signing_token_used_at.is_some() {
        return Err(ContractError::TokenAlreadyUsed);
    }
    if contract.status == ContractStatus::Cancelled {
        return Err(ContractError::ContractCancelled);
    }
    contract.status = ContractStatus::Signed;
    contract.signed_at = Some(now);
    contract.signing_token_used_at = Some(now);
    contract.updated_at = now;
    insert_contract(&contract);
    Ok(contract)
}

/// Atomically cancels a contract unless it is already cancelled or completed.
/// Returns `None` when nothing was updated.
pub fn cancel_if_voidable(contract_id: &str, now: TimestampNs) -> Option<Contract> {
    let mut contract = get_contract(contract_id)?;
    if matches!(
        contract.status,
        ContractStatus::Cancelled | ContractStatus::Completed
    ) {
        return None;
    }
    contract.status = ContractStatus::Cancelled;
    contract.voided_at = Some(now);
    contract.updated_at = now;
    insert_contract(&contract);
    Some(contract)
}

pub fn update_status(
    contract_id: &str,
    status: ContractStatus,
    now: TimestampNs,
) -> Option<Contract> {
    let mut contract = get_contract(contract_id)?;
    contract.status = status;
    contract.updated_at = now;
    insert_contract(&contract);
    Some(contract)
}
