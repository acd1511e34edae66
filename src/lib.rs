//! # cellalloc - Simulated Linear Memory with Compaction
//!
//! `cellalloc` simulates a fixed-size linear memory of integer cells and the
//! bookkeeping a real allocator has to get right:
//!
//! - **Pluggable placement**: [`FirstFit`] and [`BestFit`] search strategies
//! - **Stable handles**: blocks stay addressable across compaction through a
//!   relocation table
//! - **Compaction**: packs live blocks from address 0, coalescing free space
//!   into one run
//! - **Fail-soft exhaustion**: a request that cannot be met in full degrades
//!   to the trailing free run, and the grant says so explicitly
//! - **Layout reporting**: run-length diagnostics over the whole store
//!
//! ## Quick Start
//!
//! ```rust
//! use cellalloc::{Memory, Result};
//!
//! # fn main() -> Result<()> {
//! let mut mem = Memory::new(128);
//!
//! // Allocate a block and use it
//! let block = mem.alloc(16)?;
//! mem.write(block.handle, &[1, 2, 3, 4])?;
//! assert_eq!(mem.read(block.handle, 4)?, vec![1, 2, 3, 4]);
//!
//! // Handles survive compaction
//! mem.compact();
//! assert_eq!(mem.read(block.handle, 4)?, vec![1, 2, 3, 4]);
//!
//! mem.release(block.handle)?;
//! assert_eq!(mem.free_cells(), 128);
//! # Ok(())
//! # }
//! ```
//!
//! ## Choosing a Strategy
//!
//! ```rust
//! use cellalloc::{BestFit, Memory};
//!
//! let mut mem = Memory::with_strategy(64, BestFit);
//! let block = mem.alloc(8).unwrap();
//! assert_eq!(block.granted, 8);
//! ```

pub mod error;
pub mod handle;
pub mod layout;
pub mod memory;
pub mod occupancy;
pub mod strategy;

pub use error::{MemoryError, Result};
pub use handle::Handle;
pub use layout::{CellState, LayoutRun};
pub use memory::{Allocation, Cell, Memory, MemoryStats};
pub use occupancy::OccupancyMap;
pub use strategy::{BestFit, FirstFit, PlacementStrategy};
