//! Run-length layout reporting.
//!
//! Diagnostic view of the store: maximal runs of same-state cells, one
//! report line per run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::occupancy::OccupancyMap;

/// State of a run of cells in a layout report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Allocated,
    Free,
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellState::Allocated => f.write_str("Allocated"),
            CellState::Free => f.write_str("Free"),
        }
    }
}

/// One maximal run of same-state cells. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRun {
    pub start: usize,
    pub end: usize,
    pub state: CellState,
}

impl fmt::Display for LayoutRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "| {} - {} | {}", self.start, self.end, self.state)
    }
}

/// Merge the occupancy map into maximal `(start, end, state)` runs.
pub(crate) fn scan(occupancy: &OccupancyMap) -> Vec<LayoutRun> {
    occupancy
        .runs()
        .map(|run| LayoutRun {
            start: run.start,
            end: run.start + run.len - 1,
            state: if run.occupied {
                CellState::Allocated
            } else {
                CellState::Free
            },
        })
        .collect()
}
