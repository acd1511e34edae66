//! First-fit placement: the earliest free run that can hold the request.

use crate::occupancy::OccupancyMap;
use crate::strategy::PlacementStrategy;

/// Scans addresses in increasing order with a run-length counter and places
/// the request where a free run of `size` cells first completes. An oversized
/// run that comes first is taken as-is; no attempt is made to find a tighter
/// one further along.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit;

impl PlacementStrategy for FirstFit {
    fn find_run(&self, occupancy: &OccupancyMap, size: usize) -> Option<usize> {
        debug_assert!(size > 0);
        let mut run = 0usize;
        let mut index = occupancy.next_free(0)?;
        while index < occupancy.len() {
            if occupancy.is_set(index) {
                run = 0;
                index = occupancy.next_free(index + 1)?;
                continue;
            }
            run += 1;
            if run == size {
                return Some(index + 1 - size);
            }
            index += 1;
        }
        None
    }

    fn name(&self) -> &'static str {
        "first-fit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_free_store_places_at_zero() {
        let map = OccupancyMap::new(100);
        for size in [1, 7, 64, 100] {
            assert_eq!(FirstFit.find_run(&map, size), Some(0));
        }
    }

    #[test]
    fn test_takes_earliest_oversized_run() {
        let mut map = OccupancyMap::new(20);
        map.set_range(5, 5); // free runs: [0..5), [10..20)
        assert_eq!(FirstFit.find_run(&map, 3), Some(0));
    }

    #[test]
    fn test_skips_too_small_leading_run() {
        let mut map = OccupancyMap::new(20);
        map.set_range(2, 3); // free runs: [0..2), [5..20)
        assert_eq!(FirstFit.find_run(&map, 4), Some(5));
    }

    #[test]
    fn test_exact_fit_at_tail() {
        let mut map = OccupancyMap::new(10);
        map.set_range(0, 7);
        assert_eq!(FirstFit.find_run(&map, 3), Some(7));
    }

    #[test]
    fn test_none_when_no_run_is_large_enough() {
        let mut map = OccupancyMap::new(10);
        map.set_range(3, 1);
        map.set_range(7, 1); // free runs: 3, 3, 2 cells
        assert_eq!(FirstFit.find_run(&map, 4), None);
    }

    #[test]
    fn test_none_on_full_store() {
        let mut map = OccupancyMap::new(8);
        map.set_range(0, 8);
        assert_eq!(FirstFit.find_run(&map, 1), None);
    }

    #[test]
    fn test_request_larger_than_store() {
        let map = OccupancyMap::new(10);
        assert_eq!(FirstFit.find_run(&map, 11), None);
    }
}
