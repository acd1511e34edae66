//! Error types for memory operations

use thiserror::Error;

/// Memory operation result type
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Memory operation errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// A cell span reaches past the end of the store
    #[error("cell range {start}+{len} out of bounds (store has {capacity} cells)")]
    OutOfRange {
        start: usize,
        len: usize,
        capacity: usize,
    },

    /// No free cells remain, not even for a degraded grant
    #[error("out of memory: no free cells remain for a request of {requested}")]
    OutOfMemory { requested: usize },

    /// The handle does not resolve to a live allocation
    #[error("invalid handle: no allocation at address {address}")]
    InvalidHandle { address: usize },

    /// The handle was issued by a different memory instance
    #[error("handle belongs to a different memory instance")]
    ForeignHandle,

    /// Allocation of zero cells is rejected outright
    #[error("allocation request of zero cells")]
    ZeroSizeRequest,
}
