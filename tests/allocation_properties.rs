//! Property-based tests for allocator correctness
//!
//! Drives random alloc/release/compact sequences against a shadow model and
//! checks the bookkeeping invariants after every step, for both placement
//! strategies.

use cellalloc::{BestFit, Cell, CellState, Handle, Memory, MemoryError, PlacementStrategy};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

const STORE_SIZE: usize = 96;

struct ShadowBlock {
    handle: Handle,
    len: usize,
    tag: Cell,
    /// A later allocation was granted this block's stale address, taking
    /// over its caller-visible key. The block still occupies cells but is
    /// no longer reachable through its handle.
    displaced: bool,
}

fn check_against_shadow<S: PlacementStrategy>(
    mem: &Memory<S>,
    shadow: &[ShadowBlock],
) -> Result<(), TestCaseError> {
    let live: usize = shadow.iter().map(|b| b.len).sum();
    prop_assert_eq!(mem.free_cells(), mem.size() - live);

    let stats = mem.stats();
    prop_assert_eq!(stats.live_allocations, shadow.len());
    prop_assert_eq!(stats.free_cells, mem.size() - live);

    // The layout tiles the store without gaps or overlaps, and its
    // allocated runs account for every live cell exactly once
    let layout = mem.layout();
    let mut expected_start = 0;
    for run in &layout {
        prop_assert_eq!(run.start, expected_start);
        prop_assert!(run.end >= run.start);
        expected_start = run.end + 1;
    }
    prop_assert_eq!(expected_start, mem.size());
    let allocated: usize = layout
        .iter()
        .filter(|run| run.state == CellState::Allocated)
        .map(|run| run.end - run.start + 1)
        .sum();
    prop_assert_eq!(allocated, live);

    // Every reachable block still reads back its own pattern
    for block in shadow.iter().filter(|b| !b.displaced) {
        let cells = match mem.read(block.handle, block.len) {
            Ok(cells) => cells,
            Err(err) => return Err(TestCaseError::fail(format!("read failed: {err}"))),
        };
        prop_assert!(
            cells.iter().all(|&c| c == block.tag),
            "block tagged {} read back {:?}",
            block.tag,
            cells
        );
    }
    Ok(())
}

fn run_steps<S: PlacementStrategy>(
    mut mem: Memory<S>,
    steps: &[(u8, usize)],
) -> Result<(), TestCaseError> {
    let total = mem.size();
    let mut shadow: Vec<ShadowBlock> = Vec::new();
    let mut next_tag: Cell = 1;

    for &(selector, arg) in steps {
        let reachable: Vec<usize> = shadow
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.displaced)
            .map(|(i, _)| i)
            .collect();

        match selector % 8 {
            0..=4 => {
                let size = 1 + arg % 16;
                match mem.alloc(size) {
                    Ok(block) => {
                        prop_assert!(block.granted > 0 && block.granted <= size);
                        let address = block.handle.address();
                        // A grant at a stale caller-held address takes over
                        // that key from the relocated block holding it
                        for other in shadow.iter_mut() {
                            if !other.displaced && other.handle.address() == address {
                                other.displaced = true;
                            }
                        }
                        let tag = next_tag;
                        next_tag += 1;
                        mem.write(block.handle, &vec![tag; block.granted]).unwrap();
                        shadow.push(ShadowBlock {
                            handle: block.handle,
                            len: block.granted,
                            tag,
                            displaced: false,
                        });
                    }
                    Err(MemoryError::OutOfMemory { .. }) => {}
                    Err(other) => {
                        return Err(TestCaseError::fail(format!("alloc failed: {other}")));
                    }
                }
            }
            5..=6 if !reachable.is_empty() => {
                let victim = reachable[arg % reachable.len()];
                let block = shadow.swap_remove(victim);
                if let Err(err) = mem.release(block.handle) {
                    return Err(TestCaseError::fail(format!("release failed: {err}")));
                }
            }
            _ => mem.compact(),
        }

        check_against_shadow(&mem, &shadow)?;
    }

    // Drain every reachable block; the store must come back clean apart
    // from blocks whose key was taken over
    let displaced_cells: usize = shadow.iter().filter(|b| b.displaced).map(|b| b.len).sum();
    let displaced_count = shadow.iter().filter(|b| b.displaced).count();
    for block in shadow.iter().filter(|b| !b.displaced) {
        if let Err(err) = mem.release(block.handle) {
            return Err(TestCaseError::fail(format!("drain release failed: {err}")));
        }
    }
    prop_assert_eq!(mem.free_cells(), total - displaced_cells);
    let stats = mem.stats();
    prop_assert_eq!(stats.live_allocations, displaced_count);
    if displaced_count == 0 {
        prop_assert_eq!(stats.pending_relocations, 0);
        prop_assert!(mem.is_compact());
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_first_fit_bookkeeping(
        steps in prop::collection::vec((any::<u8>(), any::<usize>()), 1..60)
    ) {
        run_steps(Memory::new(STORE_SIZE), &steps)?;
    }

    #[test]
    fn prop_best_fit_bookkeeping(
        steps in prop::collection::vec((any::<u8>(), any::<usize>()), 1..60)
    ) {
        run_steps(Memory::with_strategy(STORE_SIZE, BestFit), &steps)?;
    }

    #[test]
    fn prop_first_fit_on_empty_store_starts_at_zero(size in 1usize..=STORE_SIZE) {
        let mut mem = Memory::new(STORE_SIZE);
        let block = mem.alloc(size).unwrap();
        prop_assert_eq!(block.handle.address(), 0);
        prop_assert_eq!(block.granted, size);
    }

    #[test]
    fn prop_compaction_preserves_values_and_order(
        sizes in prop::collection::vec(1usize..9, 2..10),
        holes in prop::collection::vec(any::<bool>(), 2..10)
    ) {
        let mut mem = Memory::new(STORE_SIZE);
        let mut blocks = Vec::new();
        for (i, &size) in sizes.iter().enumerate() {
            let block = mem.alloc(size).unwrap();
            prop_assert_eq!(block.granted, size);
            mem.write(block.handle, &vec![i as Cell + 1; size]).unwrap();
            blocks.push((block.handle, size, i as Cell + 1));
        }

        // Punch holes, then compact
        let mut kept = Vec::new();
        for (i, block) in blocks.into_iter().enumerate() {
            if holes.get(i).copied().unwrap_or(false) {
                mem.release(block.0).unwrap();
            } else {
                kept.push(block);
            }
        }
        mem.compact();
        prop_assert!(mem.is_compact());

        // Pre-compaction handles still reach their blocks with values
        // intact
        for &(handle, len, tag) in &kept {
            let cells = mem.read(handle, len).unwrap();
            prop_assert!(cells.iter().all(|&c| c == tag));
        }

        // The survivors sit packed from address 0 in their original
        // relative order: one read through the first handle sees them all
        let packed: usize = kept.iter().map(|&(_, len, _)| len).sum();
        if let Some(&(first, _, _)) = kept.first() {
            let mut expected = Vec::new();
            for &(_, len, tag) in &kept {
                expected.extend(std::iter::repeat(tag).take(len));
            }
            prop_assert_eq!(mem.read(first, packed).unwrap(), expected);
        }
        prop_assert_eq!(mem.free_cells(), STORE_SIZE - packed);
    }
}
