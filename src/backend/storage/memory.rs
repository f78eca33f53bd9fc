// src/backend/storage/memory.rs
use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
use ic_stable_structures::DefaultMemoryImpl;
use std::cell::RefCell;

// Non-overlapping IDs; never reuse a retired one.
const CONFIG_MEM_ID: MemoryId = MemoryId::new(0);
const ID_COUNTER_MEM_ID: MemoryId = MemoryId::new(1);
const CONTRACTS_MEM_ID: MemoryId = MemoryId::new(2);
const TOKEN_HASH_INDEX_MEM_ID: MemoryId = MemoryId::new(3);
const RAW_TOKEN_INDEX_MEM_ID: MemoryId = MemoryId::new(4);
const PAYMENTS_MEM_ID: MemoryId = MemoryId::new(5);
const CONTRACT_PAYMENTS_MEM_ID: MemoryId = MemoryId::new(6);
const SIGNATURES_MEM_ID: MemoryId = MemoryId::new(7);
const SIGNING_ATTEMPTS_MEM_ID: MemoryId = MemoryId::new(8);
const CONTRACT_EVENTS_MEM_ID: MemoryId = MemoryId::new(9);
const CONTRACTORS_MEM_ID: MemoryId = MemoryId::new(10);
const CLIENTS_MEM_ID: MemoryId = MemoryId::new(11);
const WEBHOOK_EVENTS_MEM_ID: MemoryId = MemoryId::new(12);
const METRICS_MEM_ID: MemoryId = MemoryId::new(13);

pub type Memory = VirtualMemory<DefaultMemoryImpl>;

thread_local! {
    static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> = RefCell::new(
        MemoryManager::init(DefaultMemoryImpl::default())
    );
}

/// Get memory instance for a specific MemoryId.
pub fn get_memory(id: MemoryId) -> Memory {
    MEMORY_MANAGER.with(|m| m.borrow().get(id))
}

pub fn get_config_memory() -> Memory {
    get_memory(CONFIG_MEM_ID)
}

pub fn get_id_counter_memory() -> Memory {
    get_memory(ID_COUNTER_MEM_ID)
}

pub fn get_contracts_memory() -> Memory {
    get_memory(CONTRACTS_MEM_ID)
}

pub fn get_token_hash_index_memory() -> Memory {
    get_memory(TOKEN_HASH_INDEX_MEM_ID)
}

pub fn get_raw_token_index_memory() -> Memory {
    get_memory(RAW_TOKEN_INDEX_MEM_ID)
}

pub fn get_payments_memory() -> Memory {
    get_memory(PAYMENTS_MEM_ID)
}

pub fn get_contract_payments_memory() -> Memory {
    get_memory(CONTRACT_PAYMENTS_MEM_ID)
}

pub fn get_signatures_memory() -> Memory {
    get_memory(SIGNATURES_MEM_ID)
}

pub fn get_signing_attempts_memory() -> Memory {
    get_memory(SIGNING_ATTEMPTS_MEM_ID)
}

pub fn get_contract_events_memory() -> Memory {
    get_memory(CONTRACT_EVENTS_MEM_ID)
}

pub fn get_contractors_memory() -> Memory {
    get_memory(CONTRACTORS_MEM_ID)
}

pub fn get_clients_memory() -> Memory {
    get_memory(CLIENTS_MEM_ID)
}

pub fn get_webhook_events_memory() -> Memory {
    get_memory(WEBHOOK_EVENTS_MEM_ID)
}

pub fn get_metrics_memory() -> Memory {
    get_memory(METRICS_MEM_ID)
}
