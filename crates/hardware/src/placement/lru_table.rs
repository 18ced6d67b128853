//! Set-associative LRU page table with migrate-or-evict decisions.
//!
//! The table tracks `cache_size / page_size` pages in `ways`-way sets indexed by
//! `page % sets`. Each slot carries per-block valid and dirty bitmaps, an LRU age
//! and a hotness counter.
//!
//! Where a tracked page's blocks live depends on the frame backing the page:
//! 1. **Near-resident pages:** blocks are served from the page's near frame.
//! 2. **Far-resident pages:** valid blocks are cached in a per-slot frame of the
//!    near device's cache region (`near_size + slot * page_size`); misses fetch
//!    from the far frame and fill the cache frame in the background.
//!
//! On a slot miss with a full set, the oldest slot is the victim. Keeping it costs
//! `migrate = 2 * blocks_per_page - valid + 1` transfers; dropping it costs
//! `evict = dirty` write-backs. A far-resident victim is promoted into the near
//! tier when the recent miss count exceeds `migrate - evict`; otherwise its dirty
//! blocks are written back. A near-resident victim relocated from the far tier
//! writes its dirty blocks home in one burst and, if it is the coldest page of the
//! set, gives its near frame back to the page it displaced. Near-home victims are
//! dropped without traffic.

use tracing::debug;

use crate::common::constants::LINE_SIZE;
use crate::common::error::McError;
use crate::config::{LruTableConfig, TierConfig};
use crate::mc::request::TierRequest;
use crate::soc::memory::device::{AccessKind, QueueHint};
use crate::soc::memory::ports::TierPorts;

use super::blocks::BlockMap;
use super::hotness::{DecayClock, decayed};
use super::remap::RemapTable;
use super::{Lookup, Outcome, PlacementEngine, Tier};

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    page: Option<u64>,
    lru: u64,
    hotness: u64,
    valid: BlockMap,
    dirty: BlockMap,
}

impl Slot {
    fn assign(&mut self, page: u64) {
        *self = Self {
            page: Some(page),
            lru: 0,
            hotness: 1,
            ..Self::default()
        };
    }

    fn touch(&mut self, block: usize, write: bool) {
        self.valid.set(block);
        if write {
            self.dirty.set(block);
        }
    }
}

/// Read-only snapshot of one occupied slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotView {
    /// Resident page.
    pub page: u64,
    /// Set index.
    pub set: usize,
    /// Way index.
    pub way: usize,
    /// LRU age; 0 for the most recently touched slot.
    pub lru: u64,
    /// Hotness counter.
    pub hotness: u64,
    /// Valid blocks.
    pub valid: BlockMap,
    /// Dirty blocks.
    pub dirty: BlockMap,
    /// Whether the page's frame is in the near tier.
    pub near_resident: bool,
}

/// LRU tiered page table.
#[derive(Debug)]
pub struct LruTable {
    sets: usize,
    ways: usize,
    page_size: u64,
    block_size: u64,
    blocks_per_page: usize,
    near_size: u64,
    near_frames: u64,
    metadata_latency: u64,
    slots: Vec<Slot>,
    clocks: Vec<DecayClock>,
    remap: RemapTable,
    miss_counter: u64,
    window_start: u64,
    miss_window: u64,
}

impl LruTable {
    /// Creates an empty table.
    ///
    /// # Arguments
    ///
    /// * `tiers` - Tier geometry and metadata latencies.
    /// * `config` - Table size, associativity and windows.
    ///
    /// # Returns
    ///
    /// A table with every slot empty and every page in its home frame.
    pub fn new(tiers: &TierConfig, config: &LruTableConfig) -> Self {
        let ways = config.ways.max(1);
        let sets = ((config.cache_size / tiers.page_size) as usize / ways).max(1);
        Self {
            sets,
            ways,
            page_size: tiers.page_size,
            block_size: tiers.block_size,
            blocks_per_page: tiers.blocks_per_page(),
            near_size: tiers.near_size,
            near_frames: tiers.near_frames(),
            metadata_latency: tiers.metadata_read_latency + tiers.metadata_write_latency,
            slots: vec![Slot::default(); sets * ways],
            clocks: vec![DecayClock::new(config.decay_period); sets],
            remap: RemapTable::new(),
            miss_counter: 0,
            window_start: 0,
            miss_window: config.miss_window,
        }
    }

    /// Returns the number of sets.
    pub fn sets(&self) -> usize {
        self.sets
    }

    /// Returns the set a page maps to.
    pub fn set_of(&self, page: u64) -> usize {
        (page % self.sets as u64) as usize
    }

    /// Returns the snapshot of the slot holding `page`, if any.
    pub fn slot_of(&self, page: u64) -> Option<SlotView> {
        let set = self.set_of(page);
        let way = self.find_way(set, page)?;
        let slot = &self.slots[set * self.ways + way];
        Some(SlotView {
            page,
            set,
            way,
            lru: slot.lru,
            hotness: slot.hotness,
            valid: slot.valid,
            dirty: slot.dirty,
            near_resident: self.is_near(page),
        })
    }

    /// Returns the pages resident in `set`, in way order.
    pub fn set_pages(&self, set: usize) -> Vec<u64> {
        self.set_slots(set).iter().filter_map(|s| s.page).collect()
    }

    /// Returns the relocation records.
    pub fn remap(&self) -> &RemapTable {
        &self.remap
    }

    /// Returns the miss count of the current window.
    pub fn miss_counter(&self) -> u64 {
        self.miss_counter
    }

    fn set_slots(&self, set: usize) -> &[Slot] {
        &self.slots[set * self.ways..(set + 1) * self.ways]
    }

    fn find_way(&self, set: usize, page: u64) -> Option<usize> {
        self.set_slots(set).iter().position(|s| s.page == Some(page))
    }

    fn free_way(&self, set: usize) -> Option<usize> {
        self.set_slots(set).iter().position(|s| s.page.is_none())
    }

    fn victim_way(&self, set: usize) -> Option<usize> {
        self.set_slots(set)
            .iter()
            .enumerate()
            .filter(|(_, s)| s.page.is_some())
            .reduce(|best, cur| if cur.1.lru > best.1.lru { cur } else { best })
            .map(|(way, _)| way)
    }

    fn age_others(&mut self, set: usize, way: usize) {
        let base = set * self.ways;
        for (w, slot) in self.slots[base..base + self.ways].iter_mut().enumerate() {
            if w != way && slot.page.is_some() {
                slot.lru += 1;
            }
        }
    }

    fn decay_set(&mut self, set: usize, now: u64) {
        let windows = self.clocks[set].windows(now);
        if windows == 0 {
            return;
        }
        let base = set * self.ways;
        for slot in &mut self.slots[base..base + self.ways] {
            slot.hotness = decayed(slot.hotness, windows);
        }
    }

    fn count_miss(&mut self, now: u64) {
        self.miss_counter += 1;
        if now.saturating_sub(self.window_start) > self.miss_window {
            self.miss_counter = 0;
            self.window_start = now;
        }
    }

    fn is_near(&self, page: u64) -> bool {
        self.remap.location(page) < self.near_frames
    }

    fn lines(&self, blocks: usize) -> u32 {
        (blocks as u64 * self.block_size / LINE_SIZE).max(1) as u32
    }

    fn frame_addr(&self, frame: u64) -> u64 {
        frame * self.page_size
    }

    fn cache_frame_addr(&self, slot_index: usize) -> u64 {
        self.near_size + slot_index as u64 * self.page_size
    }

    /// Moves `blocks` blocks of one page between devices in the background.
    fn copy(
        &self,
        ports: &mut TierPorts,
        req: &TierRequest,
        from: (Tier, u64),
        to: (Tier, u64),
        blocks: usize,
    ) {
        if blocks == 0 {
            return;
        }
        let lines = self.lines(blocks);
        let _ = match from.0 {
            Tier::Near => ports.near(req, from.1, AccessKind::Read, QueueHint::Background, lines),
            Tier::Far => ports.far(req, from.1, AccessKind::Read, QueueHint::Background, lines),
        };
        let _ = match to.0 {
            Tier::Near => ports.near(req, to.1, AccessKind::Write, QueueHint::Background, lines),
            Tier::Far => ports.far(req, to.1, AccessKind::Write, QueueHint::Background, lines),
        };
    }

    fn serve(
        &self,
        slot_index: usize,
        page: u64,
        block: usize,
        block_hit: bool,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> (u64, Tier) {
        let frame = self.remap.location(page);
        let offset = block as u64 * self.block_size;
        let kind = if req.write {
            AccessKind::Write
        } else {
            AccessKind::Read
        };
        let one = self.lines(1);
        if frame < self.near_frames {
            let addr = self.frame_addr(frame) + offset;
            let ready = ports.near(req, addr, kind, QueueHint::Immediate, one);
            return (ready, Tier::Near);
        }
        let cached = self.cache_frame_addr(slot_index) + offset;
        if block_hit || req.write {
            (ports.near(req, cached, kind, QueueHint::Immediate, one), Tier::Near)
        } else {
            let ready = ports.far(
                req,
                self.frame_addr(frame) + offset,
                AccessKind::Read,
                QueueHint::Immediate,
                one,
            );
            let _ = ports.near(req, cached, AccessKind::Write, QueueHint::Background, one);
            (ready, Tier::Far)
        }
    }

    /// Writes back the dirty blocks of `page`'s slot and clears its bitmaps.
    fn flush_slot_of(&mut self, page: u64, req: &TierRequest, ports: &mut TierPorts) {
        let set = self.set_of(page);
        let Some(way) = self.find_way(set, page) else {
            return;
        };
        let idx = set * self.ways + way;
        let frame = self.remap.location(page);
        if frame >= self.near_frames {
            let dirty = self.slots[idx].dirty.count();
            self.copy(
                ports,
                req,
                (Tier::Near, self.cache_frame_addr(idx)),
                (Tier::Far, self.frame_addr(frame)),
                dirty,
            );
        }
        self.slots[idx].valid.reset();
        self.slots[idx].dirty.reset();
    }

    /// Promotes the far-resident victim in `slot_index` into its near frame.
    fn migrate(
        &mut self,
        slot_index: usize,
        victim: u64,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) {
        let slot = self.slots[slot_index];
        let from = self.remap.location(victim);
        let target = victim % self.near_frames;
        let occupant = self.remap.occupant(target);
        self.flush_slot_of(occupant, req, ports);

        let bpp = self.blocks_per_page;
        let missing = bpp - slot.valid.count();
        let lines_missing = if missing == 0 { 0 } else { self.lines(missing) };
        if lines_missing > 0 {
            let _ = ports.far(
                req,
                self.frame_addr(from),
                AccessKind::Read,
                QueueHint::Background,
                lines_missing,
            );
        }
        if !slot.valid.is_empty() {
            let lines = self.lines(slot.valid.count());
            let _ = ports.near(
                req,
                self.cache_frame_addr(slot_index),
                AccessKind::Read,
                QueueHint::Background,
                lines,
            );
        }
        self.copy(
            ports,
            req,
            (Tier::Near, self.frame_addr(target)),
            (Tier::Far, self.frame_addr(from)),
            bpp,
        );
        let _ = ports.near(
            req,
            self.frame_addr(target),
            AccessKind::Write,
            QueueHint::Background,
            self.lines(bpp),
        );

        let _ = self.remap.swap(victim, occupant);
        debug!(victim, occupant, target, "lru table: promoted page into near frame");
    }

    /// Sends a relocated near-resident page back to its far home.
    ///
    /// The page's dirty blocks must already be home; only the displaced page
    /// moves, back into the near frame.
    fn demote(&mut self, page: u64, req: &TierRequest, ports: &mut TierPorts) {
        let near_frame = self.remap.location(page);
        let home = page;
        let displaced = self.remap.occupant(home);
        self.flush_slot_of(displaced, req, ports);
        self.copy(
            ports,
            req,
            (Tier::Far, self.frame_addr(home)),
            (Tier::Near, self.frame_addr(near_frame)),
            self.blocks_per_page,
        );
        let _ = self.remap.restore(page);
        debug!(page, displaced, near_frame, "lru table: demoted page to its home frame");
    }

    fn should_demote(&self, set: usize, way: usize, page: u64) -> bool {
        if page < self.near_frames || !self.remap.is_relocated(page) {
            return false;
        }
        let slots = self.set_slots(set);
        let hotness = slots[way].hotness;
        slots
            .iter()
            .enumerate()
            .filter(|(w, s)| *w != way && s.page.is_some())
            .all(|(_, s)| hotness <= s.hotness)
    }

    fn evict_or_migrate(
        &mut self,
        set: usize,
        way: usize,
        page: u64,
        req: &TierRequest,
        ports: &mut TierPorts,
        outcome: &mut Outcome,
    ) -> Result<(), McError> {
        let idx = set * self.ways + way;
        let victim_slot = self.slots[idx];
        let victim = victim_slot.page.ok_or(McError::VictimNotFound { set, page })?;

        let valid = victim_slot.valid.count();
        let dirty = victim_slot.dirty.count();
        let migrate_cost = (2 * self.blocks_per_page - valid + 1) as u64;
        let evict_cost = dirty as u64;
        let net_cost = migrate_cost.saturating_sub(evict_cost);
        let frame = self.remap.location(victim);

        if frame >= self.near_frames {
            if self.miss_counter > net_cost {
                self.migrate(idx, victim, req, ports);
                outcome.migrations += 1;
            } else {
                self.copy(
                    ports,
                    req,
                    (Tier::Near, self.cache_frame_addr(idx)),
                    (Tier::Far, self.frame_addr(frame)),
                    dirty,
                );
                outcome.record_eviction(dirty);
                debug!(victim, dirty, "lru table: evicted far-resident page");
            }
        } else {
            let written = if self.remap.is_relocated(victim) {
                dirty
            } else {
                0
            };
            self.copy(
                ports,
                req,
                (Tier::Near, self.frame_addr(frame)),
                (Tier::Far, self.frame_addr(victim)),
                written,
            );
            outcome.record_eviction(written);
            if self.should_demote(set, way, victim) {
                self.demote(victim, req, ports);
                outcome.demotions += 1;
            }
        }
        self.slots[idx] = Slot::default();
        Ok(())
    }
}

impl PlacementEngine for LruTable {
    fn name(&self) -> &'static str {
        "LruTable"
    }

    fn classify_and_migrate(
        &mut self,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<Outcome, McError> {
        let page = req.addr.page(self.page_size);
        let block = req.addr.block(self.page_size, self.block_size);
        let set = self.set_of(page);
        self.decay_set(set, req.cycle);

        if let Some(way) = self.find_way(set, page) {
            self.age_others(set, way);
            let idx = set * self.ways + way;
            let slot = &mut self.slots[idx];
            slot.lru = 0;
            slot.hotness += 1;
            let block_hit = slot.valid.get(block);
            slot.touch(block, req.write);
            let (ready, tier) = self.serve(idx, page, block, block_hit, req, ports);
            let lookup = if block_hit {
                Lookup::BlockHit
            } else {
                Lookup::BlockMiss
            };
            return Ok(Outcome::new(ready + self.metadata_latency, tier, lookup));
        }

        self.count_miss(req.cycle);
        let mut outcome = Outcome::new(req.cycle, Tier::Far, Lookup::SlotMiss);
        let way = if let Some(way) = self.free_way(set) {
            outcome.placed = true;
            way
        } else {
            let way = self
                .victim_way(set)
                .ok_or(McError::VictimNotFound { set, page })?;
            self.evict_or_migrate(set, way, page, req, ports, &mut outcome)?;
            way
        };
        if self.slots[set * self.ways + way].page.is_some() {
            return Err(McError::VictimNotFound { set, page });
        }

        self.age_others(set, way);
        let idx = set * self.ways + way;
        self.slots[idx].assign(page);
        self.slots[idx].touch(block, req.write);
        let (ready, tier) = self.serve(idx, page, block, false, req, ports);
        outcome.ready = ready + self.metadata_latency;
        outcome.served_by = tier;
        Ok(outcome)
    }

    fn check_invariants(&self) -> Result<(), McError> {
        for set in 0..self.sets {
            let slots = self.set_slots(set);
            for (way, slot) in slots.iter().enumerate() {
                let Some(page) = slot.page else {
                    if !slot.valid.is_empty() || !slot.dirty.is_empty() {
                        return Err(McError::QueueInconsistent {
                            set,
                            detail: format!("empty way {way} carries block state"),
                        });
                    }
                    continue;
                };
                if self.set_of(page) != set {
                    return Err(McError::SlotNotFound { set, page });
                }
                let count = slots.iter().filter(|s| s.page == Some(page)).count();
                if count > 1 {
                    return Err(McError::DuplicateResidency { page, count });
                }
                if let Some(block) = slot.dirty.first_not_in(&slot.valid) {
                    return Err(McError::DirtyWithoutValid { page, block });
                }
            }
        }
        self.remap.check_consistency()
    }
}
