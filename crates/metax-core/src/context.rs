//! # Thread-Scoped Provider Override
//!
//! A per-thread slot holding an optional override provider. When set, handler
//! revision resolves against the override instead of the session's default
//! provider. The intended use is a nested computation — a sub-planner invoked
//! recursively, say — that needs a different handler registry without
//! threading an explicit parameter through every call between it and the
//! metadata query.
//!
//! The override is installed through a scoped guard rather than a bare set/get
//! pair: [`override_provider`] swaps the slot and returns a
//! [`ProviderOverride`] whose `Drop` restores the previous value on every exit
//! path, including panics. Guards nest; restoration is LIFO. The guard is
//! deliberately `!Send`, and the slot is thread-local, so an override can never
//! leak visibility to another thread.

use crate::provider::MetadataProvider;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    static ACTIVE_OVERRIDE: RefCell<Option<Arc<dyn MetadataProvider>>> = RefCell::new(None);
}

/// The override provider currently installed on this thread, if any.
pub fn current_override() -> Option<Arc<dyn MetadataProvider>> {
    ACTIVE_OVERRIDE.with(|slot| slot.borrow().clone())
}

/// Install `provider` as this thread's override for the lifetime of the guard.
///
/// The previous slot value (possibly another override) is restored when the
/// guard drops.
#[must_use = "the override is removed as soon as the guard drops"]
pub fn override_provider(provider: Arc<dyn MetadataProvider>) -> ProviderOverride {
    let previous = ACTIVE_OVERRIDE.with(|slot| slot.borrow_mut().replace(provider));
    ProviderOverride {
        previous,
        _thread_bound: PhantomData,
    }
}

/// Scoped-override guard. Restores the prior slot value on drop.
pub struct ProviderOverride {
    previous: Option<Arc<dyn MetadataProvider>>,
    // Pins the guard to the thread whose slot it will restore.
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for ProviderOverride {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_OVERRIDE.with(|slot| *slot.borrow_mut() = previous);
    }
}
