//! Shared cells read on the hot path and written by the poller.

use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;

use crate::mapper::MappingLookup;

/// Single-slot cell holding the resolved context identifier.
#[derive(Default)]
pub(crate) struct ContextCell {
    slot: Mutex<Option<String>>,
}

impl ContextCell {
    pub(crate) fn current(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    pub(crate) fn set(&self, ctx: Option<String>) {
        *self.slot.lock() = ctx;
    }
}

/// The live mapping table, replaced wholesale on context change.
///
/// Readers take an `Arc` snapshot and release the lock immediately, so they
/// see either the old table or the fully built new one, never a partial
/// rebuild.
pub(crate) struct LookupCell {
    slot: Mutex<Arc<MappingLookup>>,
}

impl Default for LookupCell {
    fn default() -> Self {
        Self {
            slot: Mutex::new(Arc::new(MappingLookup::new())),
        }
    }
}

impl LookupCell {
    pub(crate) fn snapshot(&self) -> Arc<MappingLookup> {
        self.slot.lock().clone()
    }

    pub(crate) fn replace(&self, table: Arc<MappingLookup>) {
        *self.slot.lock() = table;
    }
}

/// The candidate set for context resolution, derived from the catalog and
/// replaced on reload.
pub(crate) struct CandidateCell {
    slot: Mutex<Arc<HashSet<String>>>,
}

impl Default for CandidateCell {
    fn default() -> Self {
        Self {
            slot: Mutex::new(Arc::new(HashSet::new())),
        }
    }
}

impl CandidateCell {
    pub(crate) fn snapshot(&self) -> Arc<HashSet<String>> {
        self.slot.lock().clone()
    }

    pub(crate) fn replace(&self, candidates: HashSet<String>) {
        *self.slot.lock() = Arc::new(candidates);
    }
}
