use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::domain::MooringId;

/// One mutex per mooring so conflict-check-then-write sequences on the same mooring run
/// one at a time while other moorings proceed in parallel.
#[derive(Default)]
pub struct MooringLocks {
    slots: Mutex<HashMap<MooringId, Arc<Mutex<()>>>>,
}

impl MooringLocks {
    /// Run `critical` while holding the lock for `mooring_id`.
    pub fn with_lock<T>(&self, mooring_id: MooringId, critical: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(mooring_id).or_default().clone()
        };

        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(mooring_id = mooring_id.0, "mooring lock acquired");
        critical()
    }
}
