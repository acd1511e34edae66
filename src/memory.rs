//! The simulated memory: cell store, bookkeeping tables, and the operations
//! tying placement, relocation, and compaction together.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MemoryError, Result};
use crate::handle::{self, Handle};
use crate::layout::{self, LayoutRun};
use crate::occupancy::OccupancyMap;
use crate::strategy::{FirstFit, PlacementStrategy};

/// One addressable unit of the simulated memory.
pub type Cell = i32;

/// Outcome of a successful allocation.
///
/// `granted` equals `requested` on the normal path. Under exhaustion the
/// store degrades instead of failing: the trailing free run is granted and
/// `granted < requested`. The caller can always tell which happened.
#[derive(Debug, Clone, Copy)]
pub struct Allocation {
    pub handle: Handle,
    pub requested: usize,
    pub granted: usize,
}

impl Allocation {
    /// True when exhaustion degraded the grant below the requested size.
    pub fn is_partial(&self) -> bool {
        self.granted < self.requested
    }
}

/// Point-in-time bookkeeping summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_cells: usize,
    pub free_cells: usize,
    pub live_allocations: usize,
    pub pending_relocations: usize,
    pub free_runs: usize,
    pub largest_free_run: usize,
}

/// A fixed-size linear memory of [`Cell`]s.
///
/// All bookkeeping lives here, arena-style: the cell store, the per-cell
/// occupancy map, the allocation table (current start address -> length) and
/// the relocation table (stale caller-held address -> current address).
/// Callers interact through [`Handle`]s; a handle survives compaction
/// because every access resolves it through the relocation table first.
///
/// Placement is pluggable via [`PlacementStrategy`]; [`FirstFit`] is the
/// default.
#[derive(Debug, Clone)]
pub struct Memory<S: PlacementStrategy = FirstFit> {
    cells: Vec<Cell>,
    occupancy: OccupancyMap,
    /// Live blocks: current start address -> length.
    allocations: BTreeMap<usize, usize>,
    /// Stale caller-held address -> current address. Kept single-hop.
    relocations: BTreeMap<usize, usize>,
    strategy: S,
    owner: u64,
}

impl Memory<FirstFit> {
    /// Create a store of `size` cells, all free, placed first-fit.
    pub fn new(size: usize) -> Self {
        Memory::with_strategy(size, FirstFit)
    }
}

impl<S: PlacementStrategy> Memory<S> {
    /// Create a store of `size` cells, all free, with an explicit strategy.
    pub fn with_strategy(size: usize, strategy: S) -> Self {
        Memory {
            cells: vec![0; size],
            occupancy: OccupancyMap::new(size),
            allocations: BTreeMap::new(),
            relocations: BTreeMap::new(),
            strategy,
            owner: handle::next_owner(),
        }
    }

    /// Total number of cells in the store.
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells not covered by a live allocation.
    pub fn free_cells(&self) -> usize {
        self.occupancy.free_cells()
    }

    /// True when free space forms one trailing run (or none at all).
    pub fn is_compact(&self) -> bool {
        match self.occupancy.trailing_free_run() {
            Some((_, len)) => len == self.occupancy.free_cells(),
            None => self.occupancy.free_cells() == 0,
        }
    }

    /// Allocate `size` contiguous cells.
    ///
    /// Placement is delegated to the strategy. When no free run is large
    /// enough, the store is compacted once and the search retried. If that
    /// still fails, the trailing free run is granted instead and the
    /// returned [`Allocation`] reports `granted < requested`; only a store
    /// with no trailing free cell at all fails with
    /// [`MemoryError::OutOfMemory`].
    pub fn alloc(&mut self, size: usize) -> Result<Allocation> {
        if size == 0 {
            return Err(MemoryError::ZeroSizeRequest);
        }

        let (address, granted) = match self.strategy.find_run(&self.occupancy, size) {
            Some(address) => (address, size),
            None => {
                warn!(
                    "{}: no free run of {} cells, compacting",
                    self.strategy.name(),
                    size
                );
                self.compact();
                match self.strategy.find_run(&self.occupancy, size) {
                    Some(address) => (address, size),
                    None => {
                        let (address, len) = self
                            .occupancy
                            .trailing_free_run()
                            .ok_or(MemoryError::OutOfMemory { requested: size })?;
                        warn!(
                            "{}: request for {} degraded to {} trailing cells at {}",
                            self.strategy.name(),
                            size,
                            len,
                            address
                        );
                        (address, len)
                    }
                }
            }
        };

        self.occupancy.set_range(address, granted);
        self.allocations.insert(address, granted);
        // The caller now holds this address directly; a pending relocation
        // still keyed by it would shadow the new block.
        self.relocations.remove(&address);

        debug!(
            "{}: allocated {} cells at {} ({} requested)",
            self.strategy.name(),
            granted,
            address,
            size
        );

        Ok(Allocation {
            handle: Handle::new(address, self.owner),
            requested: size,
            granted,
        })
    }

    /// Release the allocation `handle` refers to.
    ///
    /// The handle's address is resolved through the relocation table first;
    /// the entry used is consumed. Cells are zeroed on release. A handle
    /// that resolves to no live allocation is reported as
    /// [`MemoryError::InvalidHandle`] and the tables are left untouched.
    pub fn release(&mut self, handle: Handle) -> Result<()> {
        self.check_owner(handle)?;
        let held = handle.address();
        let via_relocation = self.relocations.contains_key(&held);
        let address = self.resolve(held);
        let len = match self.allocations.get(&address) {
            Some(&len) => len,
            None => return Err(MemoryError::InvalidHandle { address: held }),
        };

        self.allocations.remove(&address);
        if via_relocation {
            self.relocations.remove(&held);
        }
        self.cells[address..address + len].fill(0);
        self.occupancy.clear_range(address, len);

        debug!("released {} cells at {} (held as {})", len, address, held);
        Ok(())
    }

    /// Relocate every live block to pack the store from address 0.
    ///
    /// Blocks are walked in ascending current-address order, so compaction
    /// is deterministic and never reorders live blocks. Values are preserved
    /// exactly; the freed tail reads as zero. Idempotent: a compact store
    /// moves nothing and records nothing.
    pub fn compact(&mut self) {
        let mut cells = vec![0; self.cells.len()];
        let mut occupancy = OccupancyMap::new(self.cells.len());
        let mut allocations = BTreeMap::new();
        let mut moves: BTreeMap<usize, usize> = BTreeMap::new();
        let mut next = 0usize;

        for (&address, &len) in &self.allocations {
            cells[next..next + len].copy_from_slice(&self.cells[address..address + len]);
            occupancy.set_range(next, len);
            allocations.insert(next, len);
            if address != next {
                moves.insert(address, next);
            }
            next += len;
        }

        self.cells = cells;
        self.occupancy = occupancy;
        self.allocations = allocations;

        // Keep pending relocations single-hop: an entry whose target moved
        // follows its block, and a move out of an address that is already
        // some entry's target gets no entry of its own (the caller still
        // holds the older address). A move out of an address still keyed
        // in the table gets none either: that block lost its key to a
        // later grant, and the entry belongs to whoever still holds the
        // address.
        let mut retargeted: BTreeSet<usize> = BTreeSet::new();
        for target in self.relocations.values_mut() {
            if let Some(&new) = moves.get(target) {
                retargeted.insert(*target);
                *target = new;
            }
        }
        for (&old, &new) in &moves {
            if !retargeted.contains(&old) && !self.relocations.contains_key(&old) {
                self.relocations.insert(old, new);
            }
        }

        debug!(
            "compacted {} live blocks, {} moved",
            self.allocations.len(),
            moves.len()
        );
    }

    /// Read `length` cells starting at the handle's resolved address.
    ///
    /// The span may run past the handle's own block into neighboring cells;
    /// only the store boundary is enforced.
    pub fn read(&self, handle: Handle, length: usize) -> Result<Vec<Cell>> {
        self.check_owner(handle)?;
        let address = self.resolve(handle.address());
        if !self.allocations.contains_key(&address) {
            return Err(MemoryError::InvalidHandle {
                address: handle.address(),
            });
        }
        self.check_span(address, length)?;
        Ok(self.cells[address..address + length].to_vec())
    }

    /// Overwrite `values.len()` cells starting at the handle's resolved
    /// address. Same bounds rule as [`read`](Memory::read).
    pub fn write(&mut self, handle: Handle, values: &[Cell]) -> Result<()> {
        self.check_owner(handle)?;
        let address = self.resolve(handle.address());
        if !self.allocations.contains_key(&address) {
            return Err(MemoryError::InvalidHandle {
                address: handle.address(),
            });
        }
        self.check_span(address, values.len())?;
        self.cells[address..address + values.len()].copy_from_slice(values);
        Ok(())
    }

    /// Rebind: a handle at an arbitrary in-bounds address.
    ///
    /// The address is not checked against the tables until the handle is
    /// used.
    pub fn handle_at(&self, address: usize) -> Result<Handle> {
        if address >= self.cells.len() {
            return Err(MemoryError::OutOfRange {
                start: address,
                len: 1,
                capacity: self.cells.len(),
            });
        }
        Ok(Handle::new(address, self.owner))
    }

    /// Maximal same-state runs over the whole store, in address order.
    pub fn layout(&self) -> Vec<LayoutRun> {
        layout::scan(&self.occupancy)
    }

    /// The layout as report text, one `| start - end | State` line per run.
    pub fn layout_report(&self) -> String {
        self.layout()
            .iter()
            .map(LayoutRun::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Current bookkeeping counters.
    pub fn stats(&self) -> MemoryStats {
        let mut free_runs = 0;
        let mut largest_free_run = 0;
        for run in self.occupancy.runs() {
            if !run.occupied {
                free_runs += 1;
                largest_free_run = largest_free_run.max(run.len);
            }
        }
        MemoryStats {
            total_cells: self.cells.len(),
            free_cells: self.occupancy.free_cells(),
            live_allocations: self.allocations.len(),
            pending_relocations: self.relocations.len(),
            free_runs,
            largest_free_run,
        }
    }

    /// Free-space splintering score: 0.0 when free space is a single run
    /// (or there is none), approaching 1.0 as it fragments.
    pub fn fragmentation(&self) -> f64 {
        let stats = self.stats();
        if stats.free_cells == 0 || stats.free_runs <= 1 {
            return 0.0;
        }
        (stats.free_runs - 1) as f64 / stats.free_cells as f64
    }

    /// Current address for a caller-held address, following at most one
    /// relocation hop.
    fn resolve(&self, address: usize) -> usize {
        self.relocations.get(&address).copied().unwrap_or(address)
    }

    fn check_owner(&self, handle: Handle) -> Result<()> {
        if handle.owner() != self.owner {
            return Err(MemoryError::ForeignHandle);
        }
        Ok(())
    }

    fn check_span(&self, start: usize, len: usize) -> Result<()> {
        // Subtraction avoids overflow on adversarial lengths
        if start >= self.cells.len() || len > self.cells.len() - start {
            return Err(MemoryError::OutOfRange {
                start,
                len,
                capacity: self.cells.len(),
            });
        }
        Ok(())
    }
}
