//! Placement strategies for allocation search.
//!
//! A strategy decides *where* a request lands. Occupancy tracking, the
//! bookkeeping tables, and compaction are strategy-agnostic and live in
//! [`Memory`](crate::Memory).

mod best_fit;
mod first_fit;

pub use best_fit::BestFit;
pub use first_fit::FirstFit;

use crate::occupancy::OccupancyMap;

/// Search policy for placing a new allocation.
pub trait PlacementStrategy {
    /// Start address of a free run able to hold `size` cells, or `None`
    /// when no single free run is large enough.
    fn find_run(&self, occupancy: &OccupancyMap, size: usize) -> Option<usize>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
