//! Best-fit placement: the free run wasting the fewest cells.

use crate::occupancy::OccupancyMap;
use crate::strategy::PlacementStrategy;

/// Walks the maximal free runs in one scan and picks the run with the least
/// leftover space for the request. On equal leftover the later run wins, so
/// ties go to the highest-addressed candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFit;

impl PlacementStrategy for BestFit {
    fn find_run(&self, occupancy: &OccupancyMap, size: usize) -> Option<usize> {
        debug_assert!(size > 0);
        let mut best: Option<(usize, usize)> = None; // (leftover, start)
        for run in occupancy.runs() {
            if run.occupied || run.len < size {
                continue;
            }
            let leftover = run.len - size;
            // <= keeps the later run on ties
            if best.map_or(true, |(smallest, _)| leftover <= smallest) {
                best = Some((leftover, run.start));
            }
        }
        best.map(|(_, start)| start)
    }

    fn name(&self) -> &'static str {
        "best-fit"
    }
}
