//! Per-cell occupancy tracking for the cell store.
//!
//! Word-packed bitmap: each bit represents one cell, 64 cells per word.
//! Bit set = allocated, bit clear = free.

use serde::{Deserialize, Serialize};

/// A maximal run of same-state cells, as reported by [`OccupancyMap::runs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// First cell of the run.
    pub start: usize,
    /// Number of cells in the run.
    pub len: usize,
    /// Whether the run's cells are allocated.
    pub occupied: bool,
}

/// Occupancy bitmap over the cell store.
///
/// Tracks the allocated/free state of every cell:
/// - 0 = free cell
/// - 1 = allocated cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancyMap {
    /// Bitmap words (each word = 64 bits = 64 cells)
    words: Vec<u64>,

    /// Total number of cells tracked
    len: usize,

    /// Number of free cells available
    free_cells: usize,
}

impl OccupancyMap {
    /// Create a map of `len` cells, all free.
    pub fn new(len: usize) -> Self {
        let num_words = (len + 63) / 64;
        OccupancyMap {
            words: vec![0u64; num_words],
            len,
            free_cells: len,
        }
    }

    /// Total number of cells tracked.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the map tracks zero cells.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of free cells.
    pub fn free_cells(&self) -> usize {
        self.free_cells
    }

    /// Whether the cell at `index` is allocated.
    pub fn is_set(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        (self.words[index / 64] & (1u64 << (index % 64))) != 0
    }

    /// Mark `len` cells starting at `start` as allocated.
    ///
    /// The range must lie inside the map and be entirely free.
    pub fn set_range(&mut self, start: usize, len: usize) {
        debug_assert!(start + len <= self.len);
        for index in start..start + len {
            debug_assert!(!self.is_set(index), "cell {index} already allocated");
            self.words[index / 64] |= 1u64 << (index % 64);
        }
        self.free_cells -= len;
    }

    /// Mark `len` cells starting at `start` as free.
    ///
    /// The range must lie inside the map and be entirely allocated.
    pub fn clear_range(&mut self, start: usize, len: usize) {
        debug_assert!(start + len <= self.len);
        for index in start..start + len {
            debug_assert!(self.is_set(index), "cell {index} already free");
            self.words[index / 64] &= !(1u64 << (index % 64));
        }
        self.free_cells += len;
    }

    /// Next free cell at or after `from`, skipping fully-allocated words.
    pub fn next_free(&self, from: usize) -> Option<usize> {
        let mut index = from;
        while index < self.len {
            let word = self.words[index / 64];
            if word == u64::MAX {
                // All 64 cells allocated, skip the whole word
                index = (index / 64 + 1) * 64;
                continue;
            }
            if word & (1u64 << (index % 64)) == 0 {
                return Some(index);
            }
            index += 1;
        }
        None
    }

    /// Trailing run of free cells as `(start, len)`.
    ///
    /// `None` when the last cell is allocated or the map is empty.
    pub fn trailing_free_run(&self) -> Option<(usize, usize)> {
        let mut start = self.len;
        while start > 0 {
            let word = self.words[(start - 1) / 64];
            if word == 0 {
                // All 64 cells free, skip the whole word
                start = (start - 1) / 64 * 64;
                continue;
            }
            if self.is_set(start - 1) {
                break;
            }
            start -= 1;
        }
        if start == self.len {
            None
        } else {
            Some((start, self.len - start))
        }
    }

    /// Maximal same-state runs in address order.
    pub fn runs(&self) -> impl Iterator<Item = Run> + '_ {
        let mut next = 0usize;
        std::iter::from_fn(move || {
            if next >= self.len {
                return None;
            }
            let start = next;
            let occupied = self.is_set(start);
            let mut end = start + 1;
            while end < self.len && self.is_set(end) == occupied {
                end += 1;
            }
            next = end;
            Some(Run {
                start,
                len: end - start,
                occupied,
            })
        })
    }
}
