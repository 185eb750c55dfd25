// libs/booking-cell/src/services/holds.rs
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

static SLOT_HOLDS: Lazy<SlotHoldRegistry> = Lazy::new(SlotHoldRegistry::new);

/// Process-wide registry shared by every booking submission.
pub fn slot_holds() -> &'static SlotHoldRegistry {
    &SLOT_HOLDS
}

/// In-process holds on (therapist, slot start) pairs with a booking in
/// flight. A hold blocks a second submission for the same slot from this
/// process only; there is no cross-process guarantee, and the persisted
/// appointment row takes over as the source of truth once the insert lands.
pub struct SlotHoldRegistry {
    holds: Mutex<HashSet<(Uuid, DateTime<Utc>)>>,
}

impl SlotHoldRegistry {
    pub fn new() -> Self {
        Self {
            holds: Mutex::new(HashSet::new()),
        }
    }

    /// Place a hold. Returns false when the slot is already held.
    pub fn try_acquire(&self, therapist_id: Uuid, start_time: DateTime<Utc>) -> bool {
        let acquired = self.lock().insert((therapist_id, start_time));
        if acquired {
            debug!(
                "Slot hold acquired for therapist {} at {}",
                therapist_id, start_time
            );
        }
        acquired
    }

    /// Release a hold. Releasing a slot that was never held is a no-op.
    pub fn release(&self, therapist_id: Uuid, start_time: DateTime<Utc>) {
        self.lock().remove(&(therapist_id, start_time));
        debug!(
            "Slot hold released for therapist {} at {}",
            therapist_id, start_time
        );
    }

    pub fn is_held(&self, therapist_id: Uuid, start_time: DateTime<Utc>) -> bool {
        self.lock().contains(&(therapist_id, start_time))
    }

    pub fn held_count(&self) -> usize {
        self.lock().len()
    }

    // A registry poisoned by a panicked holder stays usable; the held set
    // itself is always internally consistent.
    fn lock(&self) -> MutexGuard<'_, HashSet<(Uuid, DateTime<Utc>)>> {
        match self.holds.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for SlotHoldRegistry {
    fn default() -> Self {
        Self::new()
    }
}
