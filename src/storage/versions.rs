//! In-memory version tracking with one lock per document path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Version of a document that exists on disk but was never observed by this
/// process.
pub(crate) const UNTRACKED_VERSION: u64 = 1;

/// Version slot of a single path. `None` means no version is known.
pub(crate) type Slot = Arc<Mutex<Option<u64>>>;

/// Per-path version counters.
///
/// The table lock is held only while looking up a slot; check-then-write
/// sequences run under the slot's own lock, so writers of different paths
/// never contend. A slot that knows no version is dropped by
/// [`VersionTable::release`] once nobody else holds it, so the table only
/// grows with documents this process has seen and that still exist.
#[derive(Debug, Default)]
pub(crate) struct VersionTable {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

impl VersionTable {
    pub(crate) fn slot(&self, path: &Path) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(path.to_path_buf()).or_default())
    }

    /// Forget the slot of `path` if it is unversioned and unused.
    ///
    /// Callers must drop their own handle to the slot first. Slots are only
    /// handed out under the table lock, so a count of one means no other
    /// operation can be holding or about to lock it.
    pub(crate) fn release(&self, path: &Path) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = slots
            .get(path)
            .is_some_and(|slot| Arc::strong_count(slot) == 1 && lock(slot).is_none());
        if idle {
            slots.remove(path);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Lock a slot, recovering the value if a previous holder panicked.
pub(crate) fn lock(slot: &Slot) -> MutexGuard<'_, Option<u64>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
