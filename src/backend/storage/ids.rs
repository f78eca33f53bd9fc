// src/backend/storage/ids.rs
use crate::error::ContractError;
use crate::storage::memory::{get_id_counter_memory, Memory};
use ic_stable_structures::StableCell;
use std::cell::RefCell;

thread_local! {
    /// Monotonic counter shared by every record type.
    static ID_COUNTER: RefCell<StableCell<u64, Memory>> = RefCell::new(
        StableCell::init(get_id_counter_memory(), 0)
            .expect("Failed to initialize id counter")
    );
}

/// Allocates the next identifier, e.g. `con_00000001`.
pub fn next_id(prefix: &str) -> Result<String, ContractError> {
    ID_COUNTER.with(|cell_ref| {
        let current = *cell_ref.borrow().get();
        let next = current
            .checked_add(1)
            .ok_or_else(|| ContractError::InternalError("Id counter overflow".to_string()))?;
        cell_ref
            .borrow_mut()
            .set(next)
            .map_err(|e| ContractError::StorageError(format!("Failed to update id counter: {:?}", e)))?;
        Ok(format!("{}_{:08}", prefix, next))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let first = next_id("con").unwrap();
        let second = next_id("pay").unwrap();
        assert!(first.starts_with("con_"));
        assert!(second.starts_with("pay_"));
        assert_ne!(first[4..], second[4..]);
    }
}
