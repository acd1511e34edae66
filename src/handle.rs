//! Caller-facing allocation handles.

use std::sync::atomic::{AtomicU64, Ordering};

/// Issues a process-unique stamp to each `Memory` instance.
static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_owner() -> u64 {
    NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
}

/// Opaque reference to an allocated cell range.
///
/// A handle records the address the caller was granted plus the identity of
/// the issuing [`Memory`](crate::Memory). The address may go stale once the
/// store is compacted; every access resolves it through the relocation table,
/// so a handle stays usable for the lifetime of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    address: usize,
    owner: u64,
}

impl Handle {
    pub(crate) fn new(address: usize, owner: u64) -> Self {
        Handle { address, owner }
    }

    /// The address the caller holds. Stale after compaction until the next
    /// release; resolution is automatic on every access.
    pub fn address(&self) -> usize {
        self.address
    }

    pub(crate) fn owner(&self) -> u64 {
        self.owner
    }
}
