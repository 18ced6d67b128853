//! Hot/Cold Table Unit Tests.
//!
//! Verifies set geometry, slack-based slot typing, popping of cold near pages,
//! idle demotion, write-back of cache pages, hot/cold swaps and the metadata
//! invariants.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tiersim_core::config::{HotColdConfig, TierConfig};
use tiersim_core::placement::hot_cold::{HotColdTable, SlotKind};
use tiersim_core::placement::{Lookup, PlacementEngine, Tier};
use tiersim_core::soc::memory::device::{AccessKind, QueueHint};

use crate::common::harness::{Rig, read, tiers, write};

const PAGE: u64 = 4096;

fn hot_cold(
    near_slots: usize,
    decay_period: u64,
    touch_ceiling: u64,
    swap_margin: u64,
) -> HotColdConfig {
    HotColdConfig {
        near_slots,
        decay_period,
        touch_ceiling,
        swap_margin,
    }
}

/// Two slots per set, two sets, two far groups: near 16 KiB, far 32 KiB.
fn small() -> TierConfig {
    tiers(4 * PAGE, 12 * PAGE, PAGE, 64)
}

/// Four slots per set, two sets, two far groups: near 32 KiB, far 64 KiB.
fn wide() -> TierConfig {
    tiers(8 * PAGE, 24 * PAGE, PAGE, 64)
}

// ══════════════════════════════════════════════════════════
// 1. Geometry
// ══════════════════════════════════════════════════════════

#[test]
fn set_and_member_mapping() {
    let t = HotColdTable::new(&small(), &hot_cold(2, 1000, 4, 10));
    assert_eq!(t.sets(), 2);
    assert_eq!(t.slots_per_set(), (2, 4));
    assert_eq!(t.locate(0), (0, 0));
    assert_eq!(t.locate(PAGE), (0, 1));
    assert_eq!(t.locate(2 * PAGE), (1, 0));
    // Far tier starts at 4 pages.
    assert_eq!(t.locate(4 * PAGE), (0, 2));
    assert_eq!(t.locate(5 * PAGE), (0, 3));
    assert_eq!(t.locate(6 * PAGE), (1, 2));
    assert_eq!(t.locate(8 * PAGE), (0, 4));
    assert_eq!(t.locate(9 * PAGE + 100), (0, 5));
}

proptest! {
    #[test]
    fn home_slot_address_round_trips(page in 0u64..12) {
        let t = HotColdTable::new(&small(), &hot_cold(2, 1000, 4, 10));
        let (set, member) = t.locate(page * PAGE + 64);
        prop_assert_eq!(t.slot_addr(set, member), page * PAGE);
    }
}

// ══════════════════════════════════════════════════════════
// 2. First-touch placement
// ══════════════════════════════════════════════════════════

#[test]
fn first_touch_in_empty_set_is_cache_typed() {
    let mut rig = Rig::new();
    let mut t = HotColdTable::new(&small(), &hot_cold(2, 1_000_000, 4, 10));
    let out = t.classify_and_migrate(&read(PAGE, 0), &mut rig.ports).unwrap();
    assert_eq!(out.lookup, Lookup::SlotMiss);
    assert!(out.placed);
    assert_eq!(out.served_by, Tier::Near);
    // SL = 0 - 2 - 0, so the home slot is typed as cache.
    let v = t.member_view(PAGE).unwrap();
    assert_eq!((v.slot, v.kind), (Some(1), Some(SlotKind::Cache)));
    assert_eq!(t.near_counts(0), (0, 1, 1));
    assert_eq!(rig.near.calls()[0].addr, PAGE);
}

#[test]
fn far_home_page_is_cached_in_a_free_near_slot() {
    let mut rig = Rig::new();
    let mut t = HotColdTable::new(&small(), &hot_cold(2, 1_000_000, 4, 10));
    let out = t.classify_and_migrate(&read(4 * PAGE, 0), &mut rig.ports).unwrap();
    assert_eq!(out.served_by, Tier::Near);
    let v = t.member_view(4 * PAGE).unwrap();
    assert_eq!((v.slot, v.kind), (Some(0), Some(SlotKind::Cache)));
    assert!(rig.far.is_empty());
}

#[test]
fn full_near_tier_sends_new_page_to_free_far_slot() {
    let mut rig = Rig::new();
    let mut t = HotColdTable::new(&small(), &hot_cold(2, 1_000_000, 4, 10));
    let _ = t.classify_and_migrate(&read(0, 0), &mut rig.ports).unwrap();
    let _ = t.classify_and_migrate(&read(PAGE, 1), &mut rig.ports).unwrap();
    assert_eq!(t.near_counts(0), (0, 2, 0));

    let out = t.classify_and_migrate(&read(4 * PAGE, 2), &mut rig.ports).unwrap();
    assert!(out.placed);
    assert_eq!(out.served_by, Tier::Far);
    let v = t.member_view(4 * PAGE).unwrap();
    assert_eq!((v.slot, v.kind), (Some(2), Some(SlotKind::Memory)));
    assert_eq!(t.queues(0), (vec![1, 0], vec![2]));
    assert!(t.check_invariants().is_ok());
}

#[test]
fn warm_tail_is_not_popped() {
    let mut rig = Rig::new();
    let mut t = HotColdTable::new(&small(), &hot_cold(2, 100, 4, 10));
    let _ = t.classify_and_migrate(&read(4 * PAGE, 0), &mut rig.ports).unwrap();
    let _ = t.classify_and_migrate(&read(5 * PAGE, 1), &mut rig.ports).unwrap();
    let out = t.classify_and_migrate(&read(0, 2), &mut rig.ports).unwrap();
    assert_eq!(out.served_by, Tier::Far);
    assert_eq!(out.clean_evictions + out.dirty_evictions, 0);
    assert_eq!(t.member_view(0).and_then(|v| v.slot), Some(2));
}

// ══════════════════════════════════════════════════════════
// 3. Popping the cold near tail
// ══════════════════════════════════════════════════════════

/// Caches far pages 4 and 5 (members 2 and 3) in both near slots of set 0.
/// Page 4 is written first when `dirty`.
fn cache_two_far_pages(rig: &mut Rig, dirty: bool) -> HotColdTable {
    let mut t = HotColdTable::new(&small(), &hot_cold(2, 100, 4, 10));
    let first = if dirty {
        write(4 * PAGE, 0)
    } else {
        read(4 * PAGE, 0)
    };
    let _ = t.classify_and_migrate(&first, &mut rig.ports).unwrap();
    let _ = t.classify_and_migrate(&read(5 * PAGE, 1), &mut rig.ports).unwrap();
    assert_eq!(t.near_counts(0), (0, 2, 0));
    t
}

#[test]
fn clean_cache_tail_goes_home_without_traffic() {
    let mut rig = Rig::new();
    let mut t = cache_two_far_pages(&mut rig, false);
    rig.clear();

    let out = t.classify_and_migrate(&read(0, 1000), &mut rig.ports).unwrap();
    assert!(out.placed);
    assert_eq!(out.served_by, Tier::Near);
    assert_eq!(out.clean_evictions, 1);
    assert_eq!(out.written_back_blocks, 0);
    assert!(rig.far.writes().is_empty());

    let newcomer = t.member_view(0).unwrap();
    assert_eq!((newcomer.slot, newcomer.kind), (Some(0), Some(SlotKind::Cache)));
    let popped = t.member_view(4 * PAGE).unwrap();
    assert_eq!((popped.slot, popped.kind), (Some(2), Some(SlotKind::Memory)));
    assert_eq!(t.queues(0), (vec![0, 3], vec![2]));
    assert!(t.check_invariants().is_ok());
}

#[test]
fn dirty_cache_tail_writes_dirty_blocks_home_once() {
    let mut rig = Rig::new();
    let mut t = cache_two_far_pages(&mut rig, true);
    rig.clear();

    let out = t.classify_and_migrate(&read(0, 1000), &mut rig.ports).unwrap();
    assert_eq!(out.dirty_evictions, 1);
    assert_eq!(out.written_back_blocks, 1);
    let writes = rig.far.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!((writes[0].addr, writes[0].lines), (4 * PAGE, 1));
    assert_eq!(writes[0].hint, QueueHint::Background);
    let popped = t.member_view(4 * PAGE).unwrap();
    assert_eq!(popped.slot, Some(2));
    assert!(popped.dirty.is_empty());
    assert!(t.check_invariants().is_ok());
}

#[test]
fn cache_tail_with_taken_home_moves_valid_blocks_but_counts_clean() {
    let mut rig = Rig::new();
    let mut t = cache_two_far_pages(&mut rig, false);
    // Near-home page 0 takes the first free far slot, member 2's home.
    let _ = t.classify_and_migrate(&read(0, 2), &mut rig.ports).unwrap();
    assert_eq!(t.member_view(0).and_then(|v| v.slot), Some(2));
    rig.clear();

    let out = t.classify_and_migrate(&read(PAGE, 1000), &mut rig.ports).unwrap();
    assert_eq!(out.clean_evictions, 1);
    assert_eq!(out.dirty_evictions, 0);
    assert_eq!(out.written_back_blocks, 0);
    let writes = rig.far.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!((writes[0].addr, writes[0].lines), (5 * PAGE, 1));
    assert_eq!(t.member_view(4 * PAGE).and_then(|v| v.slot), Some(3));
    assert!(t.check_invariants().is_ok());
}

/// Swaps far pages 8 and 9 (members 4 and 5) into set 0's near slots, which
/// leaves both near slots memory-typed and near-home members 0 and 1 unplaced.
fn swap_in_two_far_pages(rig: &mut Rig, touch_ceiling: u64) -> HotColdTable {
    let mut t = HotColdTable::new(&small(), &hot_cold(2, 100, touch_ceiling, 3));
    let stream = [4, 5, 8, 8, 8, 8, 9, 9, 9, 9];
    let mut swaps = 0;
    for (cycle, page) in stream.into_iter().enumerate() {
        let out = t.classify_and_migrate(&read(page * PAGE, cycle as u64), &mut rig.ports).unwrap();
        swaps += out.swaps;
    }
    assert_eq!(swaps, 2);
    assert_eq!(t.near_counts(0), (2, 0, 0));
    assert_eq!(t.member_view(9 * PAGE).and_then(|v| v.slot), Some(0));
    assert_eq!(t.member_view(8 * PAGE).and_then(|v| v.slot), Some(1));
    assert_eq!(t.queues(0), (vec![5, 4], vec![2, 3]));
    t
}

#[test]
fn cold_memory_tail_is_reclassified() {
    let mut rig = Rig::new();
    let mut t = swap_in_two_far_pages(&mut rig, 100);

    let out = t.classify_and_migrate(&read(0, 1000), &mut rig.ports).unwrap();
    assert_eq!(out.demotions, 1);
    assert_eq!(out.served_by, Tier::Far);
    assert_eq!(t.member_view(8 * PAGE).and_then(|v| v.kind), Some(SlotKind::Cache));
    assert_eq!(t.near_counts(0), (1, 1, 0));
    assert_eq!(t.member_view(0).and_then(|v| v.slot), Some(2));
    assert!(t.check_invariants().is_ok());
}

#[test]
fn swapped_in_page_is_reclassified_then_leaves_as_clean_eviction() {
    let mut rig = Rig::new();
    let mut t = swap_in_two_far_pages(&mut rig, 100);
    let _ = t.classify_and_migrate(&read(0, 1000), &mut rig.ports).unwrap();
    rig.clear();

    // Page 8 gave its far home to page 5 in the swap, so it moves whole to a free slot.
    let out = t.classify_and_migrate(&read(PAGE, 2000), &mut rig.ports).unwrap();
    assert_eq!(out.clean_evictions, 1);
    assert_eq!(out.dirty_evictions, 0);
    assert_eq!(out.written_back_blocks, 0);
    let writes = rig.far.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!((writes[0].addr, writes[0].lines), (5 * PAGE, 64));

    let evicted = t.member_view(8 * PAGE).unwrap();
    assert_eq!((evicted.slot, evicted.kind), (Some(3), Some(SlotKind::Memory)));
    let newcomer = t.member_view(PAGE).unwrap();
    assert_eq!((newcomer.slot, newcomer.kind), (Some(1), Some(SlotKind::Cache)));
    assert!(t.check_invariants().is_ok());
}

// ══════════════════════════════════════════════════════════
// 4. Idle demotion
// ══════════════════════════════════════════════════════════

#[test]
fn idle_memory_page_is_reclassified_after_touch_ceiling() {
    let mut rig = Rig::new();
    let mut t = swap_in_two_far_pages(&mut rig, 2);

    let out = t.classify_and_migrate(&read(9 * PAGE, 500), &mut rig.ports).unwrap();
    assert_eq!(out.lookup, Lookup::BlockHit);
    assert_eq!(out.demotions, 1);
    assert_eq!(t.member_view(8 * PAGE).and_then(|v| v.kind), Some(SlotKind::Cache));
    assert_eq!(t.near_counts(0), (1, 1, 0));
}

/// Caches far page 8 (member 4) in near slot 0 of set 0, then swaps far pages
/// 16, 17 and 18 in over the other near slots so the set prefers memory typing.
/// Page 8 is last touched at cycle 11, by a write when `dirty`.
fn cache_far_page_among_memory(rig: &mut Rig, dirty: bool) -> HotColdTable {
    let mut t = HotColdTable::new(&wide(), &hot_cold(4, 100, 6, 1));
    let mut swaps = 0;
    let stream = [8 * PAGE, PAGE, 2 * PAGE, 3 * PAGE, 8 * PAGE + 64];
    for (cycle, addr) in stream.into_iter().enumerate() {
        let out = t.classify_and_migrate(&read(addr, cycle as u64), &mut rig.ports).unwrap();
        swaps += out.swaps;
    }
    for (cycle, page) in [16, 16, 17, 17, 18, 18].into_iter().enumerate() {
        let req = read(page * PAGE, 5 + cycle as u64);
        swaps += t.classify_and_migrate(&req, &mut rig.ports).unwrap().swaps;
    }
    let last = if dirty {
        write(8 * PAGE, 11)
    } else {
        read(8 * PAGE, 11)
    };
    let _ = t.classify_and_migrate(&last, &mut rig.ports).unwrap();

    assert_eq!(swaps, 3);
    assert_eq!(t.near_counts(0), (3, 1, 0));
    let cached = t.member_view(8 * PAGE).unwrap();
    assert_eq!((cached.slot, cached.kind), (Some(0), Some(SlotKind::Cache)));
    assert_eq!(cached.dirty.count(), usize::from(dirty));
    t
}

#[test]
fn idle_clean_cache_page_goes_home_without_traffic() {
    let mut rig = Rig::new();
    let mut t = cache_far_page_among_memory(&mut rig, false);
    rig.clear();

    let out = t.classify_and_migrate(&read(16 * PAGE, 500), &mut rig.ports).unwrap();
    assert_eq!(out.lookup, Lookup::BlockHit);
    assert_eq!(out.clean_evictions, 1);
    assert_eq!(out.written_back_blocks, 0);
    assert!(rig.far.writes().is_empty());
    let v = t.member_view(8 * PAGE).unwrap();
    assert_eq!((v.slot, v.kind), (Some(4), Some(SlotKind::Memory)));
    assert_eq!(t.near_counts(0), (3, 0, 1));
    assert!(t.check_invariants().is_ok());
}

#[test]
fn idle_dirty_cache_page_writes_dirty_blocks_home() {
    let mut rig = Rig::new();
    let mut t = cache_far_page_among_memory(&mut rig, true);
    rig.clear();

    let out = t.classify_and_migrate(&read(16 * PAGE, 500), &mut rig.ports).unwrap();
    assert!(!out.placed);
    assert_eq!(out.dirty_evictions, 1);
    assert_eq!(out.written_back_blocks, 1);

    let writes = rig.far.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!((writes[0].addr, writes[0].lines), (8 * PAGE, 1));
    let v = t.member_view(8 * PAGE).unwrap();
    assert_eq!((v.slot, v.kind), (Some(4), Some(SlotKind::Memory)));
    assert!(v.dirty.is_empty());
    assert_eq!(t.near_counts(0), (3, 0, 1));
    assert!(t.check_invariants().is_ok());
}

// ══════════════════════════════════════════════════════════
// 5. Swaps
// ══════════════════════════════════════════════════════════

#[test]
fn hot_far_page_swaps_with_coldest_near_page() {
    let mut rig = Rig::new();
    let mut t = HotColdTable::new(&small(), &hot_cold(2, 1_000_000, 100, 3));
    let _ = t.classify_and_migrate(&read(0, 0), &mut rig.ports).unwrap();
    let _ = t.classify_and_migrate(&read(PAGE, 1), &mut rig.ports).unwrap();
    let _ = t.classify_and_migrate(&read(4 * PAGE, 2), &mut rig.ports).unwrap();

    let first = t.classify_and_migrate(&read(4 * PAGE, 3), &mut rig.ports).unwrap();
    let second = t.classify_and_migrate(&read(4 * PAGE, 4), &mut rig.ports).unwrap();
    assert_eq!(first.swaps + second.swaps, 0);
    rig.clear();

    let third = t.classify_and_migrate(&read(4 * PAGE, 5), &mut rig.ports).unwrap();
    assert_eq!(third.swaps, 1);
    assert_eq!(third.served_by, Tier::Far);

    // Member 1 was at the front of the near queue, so it is the first-found coldest.
    let hot = t.member_view(4 * PAGE).unwrap();
    assert_eq!((hot.slot, hot.kind), (Some(1), Some(SlotKind::Memory)));
    assert_eq!(hot.valid.count(), 64);
    assert_eq!(t.member_view(PAGE).and_then(|v| v.slot), Some(2));
    assert_eq!(t.queues(0), (vec![2, 0], vec![1]));
    assert_eq!(t.near_counts(0), (1, 1, 0));
    assert_eq!(rig.far.count(AccessKind::Read, QueueHint::Background), 1);
    assert_eq!(rig.far.count(AccessKind::Write, QueueHint::Background), 1);
    assert_eq!(rig.near.count(AccessKind::Read, QueueHint::Background), 1);
    assert_eq!(rig.near.count(AccessKind::Write, QueueHint::Background), 1);
    assert!(t.check_invariants().is_ok());
}

#[test]
fn dirty_cache_page_blocks_swaps() {
    let mut rig = Rig::new();
    let mut t = HotColdTable::new(&small(), &hot_cold(2, 1_000_000, 100, 3));
    let _ = t.classify_and_migrate(&write(0, 0), &mut rig.ports).unwrap();
    let _ = t.classify_and_migrate(&read(PAGE, 1), &mut rig.ports).unwrap();
    let mut swaps = 0;
    for cycle in 2..10 {
        swaps += t.classify_and_migrate(&read(4 * PAGE, cycle), &mut rig.ports).unwrap().swaps;
    }
    assert_eq!(swaps, 0);
    assert_eq!(t.member_view(4 * PAGE).and_then(|v| v.slot), Some(2));
    assert_eq!(t.near_counts(0), (0, 2, 0));
}

// ══════════════════════════════════════════════════════════
// 6. Invariants under random traffic
// ══════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn random_streams_keep_metadata_consistent(
        ops in prop::collection::vec((0u64..12 * 64, any::<bool>(), 0u64..80), 1..200)
    ) {
        let mut rig = Rig::new();
        let mut t = HotColdTable::new(&small(), &hot_cold(2, 50, 1, 2));
        let mut cycle = 0;
        for (block, is_write, step) in ops {
            cycle += step;
            let addr = block * 64;
            let req = if is_write { write(addr, cycle) } else { read(addr, cycle) };
            prop_assert!(t.classify_and_migrate(&req, &mut rig.ports).is_ok());
            prop_assert!(t.check_invariants().is_ok());
        }
    }
}
