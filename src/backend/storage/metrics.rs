// src/backend/storage/metrics.rs
use crate::metrics::ServiceMetrics;
use crate::storage::memory::{get_metrics_memory, Memory};
use crate::storage::storable::Cbor;
use ic_stable_structures::StableCell;
use std::cell::RefCell;

type StorableMetrics = Cbor<ServiceMetrics>;

thread_local! {
    static METRICS_CELL: RefCell<StableCell<StorableMetrics, Memory>> = RefCell::new(
        StableCell::init(get_metrics_memory(), Cbor(ServiceMetrics::default()))
            .expect("Failed to initialize metrics stable cell")
    );
}

pub fn get_metrics() -> ServiceMetrics {
    METRICS_CELL.with(|cell| cell.borrow().get().0.clone())
}

pub fn update_metrics<F>(update_fn: F) -> Result<(), String>
where
    F: FnOnce(&mut ServiceMetrics),
{
    METRICS_CELL.with(|cell| {
        let mut metrics = cell.borrow().get().0.clone();
        update_fn(&mut metrics);
        cell.borrow_mut()
            .set(Cbor(metrics))
            .map_err(|e| format!("Failed to update metrics: {:?}", e))?;
        Ok(())
    })
}
