//! Hot/cold page table with near and far hotness queues.
//!
//! The physical space is cut into sets of `n` near pages plus `m = n * groups`
//! far pages, where `groups = far_size / near_size`. Each page of a set is a
//! *member* with a fixed home slot (slot index == member index); slots `0..n` are
//! near frames, slots `n..n+m` far frames. A member is placed in a slot on first
//! touch, preferably its home.
//!
//! Near slots are typed:
//! 1. **Memory:** the slot's frame is the page's only copy.
//! 2. **Cache:** the slot holds a copy of the page; blocks fill on demand and
//!    dirty blocks must be written to a far slot when the copy is dropped.
//! 3. **Free:** unoccupied.
//!
//! Far slots are always memory. A page entering a near slot is typed by the set's
//! slack `SL = memory - free - cache`: memory while `SL > 0`, cache otherwise.
//! Swapped-in pages are always memory.
//!
//! Two insertion-ordered queues track members resident in near and far slots. When
//! the near tier is full and a near-home page arrives, a near-queue tail whose
//! counter decayed to zero is popped. Idle near pages are demoted once enough near
//! touches accumulate. A far page whose hotness leads the coldest near page by
//! `swap_margin` swaps in while the near tier is full and no cache page is dirty.
//!
//! A cache page leaving the near tier goes to its far home when that slot is free
//! and then writes only its dirty blocks; any other far slot receives every valid
//! block.

use tracing::debug;

use crate::common::constants::LINE_SIZE;
use crate::common::error::McError;
use crate::config::{HotColdConfig, TierConfig};
use crate::mc::request::TierRequest;
use crate::soc::memory::device::{AccessKind, QueueHint};
use crate::soc::memory::ports::TierPorts;

use super::blocks::BlockMap;
use super::hotness::{DecayClock, HotnessQueue, decayed};
use super::{Lookup, Outcome, PlacementEngine, Tier};

/// Role of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Unoccupied.
    Free,
    /// Raw-mapped frame holding the page's only copy.
    Memory,
    /// Near frame caching a page block by block.
    Cache,
}

#[derive(Clone, Copy, Debug)]
struct SlotEntry {
    member: Option<usize>,
    kind: SlotKind,
}

#[derive(Clone, Copy, Debug, Default)]
struct BlockEntry {
    valid: BlockMap,
    dirty: BlockMap,
    counter: u64,
    last_touch: u64,
    slot: Option<usize>,
}

/// Snapshot of one member of a set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberView {
    /// Set index.
    pub set: usize,
    /// Member index inside the set; `< n` for near-home pages.
    pub member: usize,
    /// Slot holding the member, if placed.
    pub slot: Option<usize>,
    /// Kind of that slot.
    pub kind: Option<SlotKind>,
    /// Valid blocks.
    pub valid: BlockMap,
    /// Dirty blocks.
    pub dirty: BlockMap,
    /// Per-page hotness counter.
    pub counter: u64,
}

#[derive(Clone, Copy, Debug)]
struct Geometry {
    n: usize,
    m: usize,
    page_size: u64,
    block_size: u64,
    near_size: u64,
    decay_period: u64,
    touch_ceiling: u64,
    swap_margin: u64,
    blocks_per_page: usize,
}

impl Geometry {
    fn locate(&self, addr: u64) -> (usize, usize) {
        let n = self.n as u64;
        let group = n * self.page_size;
        if addr < self.near_size {
            ((addr / group) as usize, (addr / self.page_size % n) as usize)
        } else {
            let far = addr - self.near_size;
            let set = (far % self.near_size / group) as usize;
            let member = self.n
                + (far / self.near_size) as usize * self.n
                + (far / self.page_size % n) as usize;
            (set, member)
        }
    }

    fn slot_addr(&self, set: usize, slot: usize) -> u64 {
        let group = self.n as u64 * self.page_size;
        if slot < self.n {
            set as u64 * group + slot as u64 * self.page_size
        } else {
            let i = (slot - self.n) as u64;
            let n = self.n as u64;
            self.near_size + i / n * self.near_size + set as u64 * group + i % n * self.page_size
        }
    }

    fn lines(&self, blocks: usize) -> u32 {
        (blocks as u64 * self.block_size / LINE_SIZE).max(1) as u32
    }

    fn idle_windows(&self, now: u64, last: u64) -> u64 {
        if self.decay_period == 0 {
            0
        } else {
            now.saturating_sub(last) / self.decay_period
        }
    }
}

#[derive(Clone, Debug)]
struct HotColdSet {
    slots: Vec<SlotEntry>,
    members: Vec<BlockEntry>,
    near_q: HotnessQueue,
    far_q: HotnessQueue,
    clock: DecayClock,
    touched: u64,
}

impl HotColdSet {
    fn new(geo: &Geometry) -> Self {
        let total = geo.n + geo.m;
        Self {
            slots: vec![
                SlotEntry {
                    member: None,
                    kind: SlotKind::Free,
                };
                total
            ],
            members: vec![BlockEntry::default(); total],
            near_q: HotnessQueue::new(),
            far_q: HotnessQueue::new(),
            clock: DecayClock::new(geo.decay_period),
            touched: 0,
        }
    }

    /// Returns `(na, nc, nn)`: memory-typed occupied, cache-typed, and free near slots.
    fn counts(&self, geo: &Geometry) -> (usize, usize, usize) {
        let mut na = 0;
        let mut nc = 0;
        for slot in &self.slots[..geo.n] {
            match slot.kind {
                SlotKind::Memory => na += 1,
                SlotKind::Cache => nc += 1,
                SlotKind::Free => {}
            }
        }
        (na, nc, geo.n - na - nc)
    }

    fn memory_preferred(&self, geo: &Geometry) -> bool {
        let (na, nc, nn) = self.counts(geo);
        na as i64 - nn as i64 - nc as i64 > 0
    }

    fn free_in(&self, range: std::ops::Range<usize>, prefer: Option<usize>) -> Option<usize> {
        if let Some(p) = prefer
            && range.contains(&p)
            && self.slots[p].member.is_none()
        {
            return Some(p);
        }
        range.into_iter().find(|&i| self.slots[i].member.is_none())
    }

    fn free_near(&self, geo: &Geometry, prefer: Option<usize>) -> Option<usize> {
        self.free_in(0..geo.n, prefer)
    }

    fn free_far(&self, geo: &Geometry, prefer: Option<usize>) -> Option<usize> {
        self.free_in(geo.n..geo.n + geo.m, prefer)
    }

    fn occupy(&mut self, slot: usize, member: usize, kind: SlotKind) {
        self.slots[slot] = SlotEntry {
            member: Some(member),
            kind,
        };
        self.members[member].slot = Some(slot);
    }

    fn vacate(&mut self, slot: usize) {
        if let Some(member) = self.slots[slot].member.take() {
            self.members[member].slot = None;
        }
        self.slots[slot].kind = SlotKind::Free;
    }

    fn move_queue_entry(from: &mut HotnessQueue, to: &mut HotnessQueue, member: usize, now: u64) {
        if let Some(mut entry) = from.remove(member as u64) {
            entry.last_touch = now;
            to.insert(entry);
        }
    }

    fn copy(
        geo: &Geometry,
        ports: &mut TierPorts,
        req: &TierRequest,
        from: (Tier, u64),
        to: (Tier, u64),
        blocks: usize,
    ) {
        if blocks == 0 {
            return;
        }
        let lines = geo.lines(blocks);
        let _ = match from.0 {
            Tier::Near => ports.near(req, from.1, AccessKind::Read, QueueHint::Background, lines),
            Tier::Far => ports.far(req, from.1, AccessKind::Read, QueueHint::Background, lines),
        };
        let _ = match to.0 {
            Tier::Near => ports.near(req, to.1, AccessKind::Write, QueueHint::Background, lines),
            Tier::Far => ports.far(req, to.1, AccessKind::Write, QueueHint::Background, lines),
        };
    }

    fn access(
        geo: &Geometry,
        ports: &mut TierPorts,
        req: &TierRequest,
        tier: Tier,
        addr: u64,
    ) -> u64 {
        let kind = if req.write {
            AccessKind::Write
        } else {
            AccessKind::Read
        };
        let one = geo.lines(1);
        match tier {
            Tier::Near => ports.near(req, addr, kind, QueueHint::Immediate, one),
            Tier::Far => ports.far(req, addr, kind, QueueHint::Immediate, one),
        }
    }

    fn touch_block(&mut self, member: usize, block: usize, write: bool, near: bool) {
        let entry = &mut self.members[member];
        entry.valid.set(block);
        if write && near {
            entry.dirty.set(block);
        }
    }

    fn near_kind(memory_preferred: bool) -> SlotKind {
        if memory_preferred {
            SlotKind::Memory
        } else {
            SlotKind::Cache
        }
    }

    fn dirty_cache_page(&self, geo: &Geometry) -> bool {
        self.slots[..geo.n].iter().any(|s| {
            s.kind == SlotKind::Cache
                && s.member.is_some_and(|m| !self.members[m].dirty.is_empty())
        })
    }

    /// Moves the cache page in near `slot` to a free far slot, preferring its home.
    ///
    /// Returns the destination, or `None` with nothing changed if the far tier is full.
    #[allow(clippy::too_many_arguments)]
    fn write_back(
        &mut self,
        geo: &Geometry,
        set: usize,
        member: usize,
        slot: usize,
        req: &TierRequest,
        ports: &mut TierPorts,
        outcome: &mut Outcome,
    ) -> Option<usize> {
        let home = (member >= geo.n).then_some(member);
        let dest = self.free_far(geo, home)?;
        let entry = self.members[member];
        let blocks = if Some(dest) == home {
            entry.dirty.count()
        } else {
            entry.valid.count()
        };
        Self::copy(
            geo,
            ports,
            req,
            (Tier::Near, geo.slot_addr(set, slot)),
            (Tier::Far, geo.slot_addr(set, dest)),
            blocks,
        );
        self.vacate(slot);
        self.occupy(dest, member, SlotKind::Memory);
        self.members[member].dirty.reset();
        Self::move_queue_entry(&mut self.near_q, &mut self.far_q, member, req.cycle);
        outcome.record_eviction(entry.dirty.count());
        debug!(set, member, to = dest, blocks, "hot/cold: wrote back cache page");
        Some(dest)
    }

    fn inconsistent(set: usize, detail: impl Into<String>) -> McError {
        McError::QueueInconsistent {
            set,
            detail: detail.into(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn handle(
        &mut self,
        geo: &Geometry,
        set: usize,
        member: usize,
        block: usize,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<Outcome, McError> {
        let now = req.cycle;
        let windows = self.clock.windows(now);
        self.near_q.decay(windows);
        self.far_q.decay(windows);
        let pop = self
            .near_q
            .tail()
            .filter(|e| e.counter == 0)
            .map(|e| e.page as usize);

        let entry = &mut self.members[member];
        let idle = geo.idle_windows(now, entry.last_touch);
        entry.counter = decayed(entry.counter, idle) + 1;
        entry.last_touch = now;

        let memory_preferred = self.memory_preferred(geo);
        let mut outcome = match self.members[member].slot {
            None => self.allocate(geo, set, member, block, pop, memory_preferred, req, ports)?,
            Some(slot) => self.hit(geo, set, member, slot, block, memory_preferred, req, ports)?,
        };
        if self.try_swap(geo, set, req, ports)? {
            outcome.swaps += 1;
        }
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn allocate(
        &mut self,
        geo: &Geometry,
        set: usize,
        member: usize,
        block: usize,
        pop: Option<usize>,
        memory_preferred: bool,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<Outcome, McError> {
        let now = req.cycle;
        let near_home = member < geo.n;
        let offset = block as u64 * geo.block_size;
        let kind = Self::near_kind(memory_preferred);

        if let Some(slot) = self.free_near(geo, near_home.then_some(member)) {
            self.occupy(slot, member, kind);
            self.touch_block(member, block, req.write, true);
            let addr = geo.slot_addr(set, slot) + offset;
            let ready = Self::access(geo, ports, req, Tier::Near, addr);
            let mut outcome = Outcome::new(ready, Tier::Near, Lookup::SlotMiss);
            outcome.placed = true;
            let _ = self.near_q.touch(member as u64, now);
            self.touched += 1;
            if self.touched > geo.touch_ceiling && self.memory_preferred(geo) {
                self.try_evict(geo, set, req, ports, &mut outcome)?;
            }
            return Ok(outcome);
        }

        let mut outcome = Outcome::new(req.cycle, Tier::Far, Lookup::SlotMiss);
        if near_home && let Some(cand) = pop {
            let cand_slot = self.members[cand]
                .slot
                .filter(|&s| s < geo.n)
                .ok_or_else(|| {
                    Self::inconsistent(set, format!("near queue tail {cand} not in a near slot"))
                })?;
            match self.slots[cand_slot].kind {
                SlotKind::Cache => {
                    let dest = self
                        .write_back(geo, set, cand, cand_slot, req, ports, &mut outcome)
                        .ok_or(McError::NoFreeSlot { set, tier: "far" })?;
                    debug!(set, popped = cand, to = dest, "hot/cold: popped cold cache page");

                    self.occupy(cand_slot, member, kind);
                    self.touch_block(member, block, req.write, true);
                    let addr = geo.slot_addr(set, cand_slot) + offset;
                    outcome.ready = Self::access(geo, ports, req, Tier::Near, addr);
                    outcome.served_by = Tier::Near;
                    outcome.placed = true;
                    let _ = self.near_q.touch(member as u64, now);
                    return Ok(outcome);
                }
                SlotKind::Memory => {
                    self.slots[cand_slot].kind = SlotKind::Cache;
                    outcome.demotions += 1;
                    debug!(set, member = cand, "hot/cold: reclassified cold memory page as cache");
                }
                SlotKind::Free => {
                    return Err(Self::inconsistent(
                        set,
                        format!("near slot {cand_slot} free but queued"),
                    ));
                }
            }
        }

        let slot = self
            .free_far(geo, (!near_home).then_some(member))
            .ok_or(McError::NoFreeSlot { set, tier: "far" })?;
        self.occupy(slot, member, SlotKind::Memory);
        self.touch_block(member, block, req.write, false);
        outcome.ready = Self::access(geo, ports, req, Tier::Far, geo.slot_addr(set, slot) + offset);
        outcome.served_by = Tier::Far;
        outcome.placed = true;
        let _ = self.far_q.touch(member as u64, now);
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn hit(
        &mut self,
        geo: &Geometry,
        set: usize,
        member: usize,
        slot: usize,
        block: usize,
        memory_preferred: bool,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<Outcome, McError> {
        let now = req.cycle;
        let kind = self.slots[slot].kind;
        let near = slot < geo.n;
        let block_hit = self.members[member].valid.get(block);
        let offset = block as u64 * geo.block_size;
        let here = geo.slot_addr(set, slot) + offset;

        let (ready, tier) = if !near {
            (Self::access(geo, ports, req, Tier::Far, here), Tier::Far)
        } else if kind == SlotKind::Cache && !block_hit && !req.write && member >= geo.n {
            let home = geo.slot_addr(set, member) + offset;
            let ready = ports.far(req, home, AccessKind::Read, QueueHint::Immediate, geo.lines(1));
            let _ = ports.near(req, here, AccessKind::Write, QueueHint::Background, geo.lines(1));
            (ready, Tier::Far)
        } else {
            (Self::access(geo, ports, req, Tier::Near, here), Tier::Near)
        };
        self.touch_block(member, block, req.write, near);

        let lookup = if block_hit {
            Lookup::BlockHit
        } else {
            Lookup::BlockMiss
        };
        let mut outcome = Outcome::new(ready, tier, lookup);

        if near {
            let _ = self.near_q.touch(member as u64, now);
            self.touched += 1;
            let (_, _, nn) = self.counts(geo);
            if self.touched > geo.touch_ceiling && nn < 2 && memory_preferred {
                self.try_evict(geo, set, req, ports, &mut outcome)?;
            }
        } else {
            let _ = self.far_q.touch(member as u64, now);
        }
        Ok(outcome)
    }

    /// Demotes the near-queue tail if it has been idle longer than one decay period.
    fn try_evict(
        &mut self,
        geo: &Geometry,
        set: usize,
        req: &TierRequest,
        ports: &mut TierPorts,
        outcome: &mut Outcome,
    ) -> Result<(), McError> {
        let now = req.cycle;
        self.touched = 0;
        let Some(tail) = self.near_q.tail().copied() else {
            return Ok(());
        };
        if now.saturating_sub(tail.last_touch) <= geo.decay_period {
            return Ok(());
        }
        let member = tail.page as usize;
        let slot = self.members[member]
            .slot
            .filter(|&s| s < geo.n)
            .ok_or_else(|| {
                Self::inconsistent(set, format!("near queue tail {member} not in a near slot"))
            })?;

        match self.slots[slot].kind {
            SlotKind::Cache => {
                if self.write_back(geo, set, member, slot, req, ports, outcome).is_some() {
                    debug!(set, member, "hot/cold: evicted idle cache page");
                }
            }
            SlotKind::Memory => {
                self.slots[slot].kind = SlotKind::Cache;
                outcome.demotions += 1;
                debug!(set, member, "hot/cold: reclassified idle memory page as cache");
            }
            SlotKind::Free => {
                return Err(Self::inconsistent(set, format!("near slot {slot} free but queued")));
            }
        }
        Ok(())
    }

    /// Swaps the hottest far page with the coldest near page when the lead is large enough.
    fn try_swap(
        &mut self,
        geo: &Geometry,
        set: usize,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<bool, McError> {
        let (_, _, nn) = self.counts(geo);
        if nn > 0 || self.dirty_cache_page(geo) {
            return Ok(false);
        }
        let coldest = self.near_q.coldest().copied();
        let hottest = self.far_q.hottest().copied();
        let (Some(cold), Some(hot)) = (coldest, hottest) else {
            return Ok(false);
        };
        if hot.counter < cold.counter + geo.swap_margin {
            return Ok(false);
        }
        let cold_member = cold.page as usize;
        let hot_member = hot.page as usize;
        let cold_slot = self.members[cold_member]
            .slot
            .filter(|&s| s < geo.n)
            .ok_or_else(|| {
                Self::inconsistent(set, format!("near queue page {cold_member} not in a near slot"))
            })?;
        let hot_slot = self.members[hot_member]
            .slot
            .filter(|&s| s >= geo.n)
            .ok_or_else(|| {
                Self::inconsistent(set, format!("far queue page {hot_member} not in a far slot"))
            })?;

        let near_addr = geo.slot_addr(set, cold_slot);
        let far_addr = geo.slot_addr(set, hot_slot);
        let bpp = geo.blocks_per_page;
        Self::copy(geo, ports, req, (Tier::Far, far_addr), (Tier::Near, near_addr), bpp);
        Self::copy(geo, ports, req, (Tier::Near, near_addr), (Tier::Far, far_addr), bpp);

        self.vacate(cold_slot);
        self.vacate(hot_slot);
        self.occupy(cold_slot, hot_member, SlotKind::Memory);
        self.occupy(hot_slot, cold_member, SlotKind::Memory);
        self.members[cold_member].dirty.reset();
        self.members[hot_member].dirty.reset();
        self.members[hot_member].valid = BlockMap::full(bpp);
        Self::move_queue_entry(&mut self.near_q, &mut self.far_q, cold_member, req.cycle);
        Self::move_queue_entry(&mut self.far_q, &mut self.near_q, hot_member, req.cycle);
        debug!(set, hot = hot_member, cold = cold_member, "hot/cold: swapped pages");
        Ok(true)
    }

    fn check(&self, geo: &Geometry, set: usize) -> Result<(), McError> {
        for (slot, entry) in self.slots.iter().enumerate() {
            match (entry.member, entry.kind) {
                (None, SlotKind::Free) => {}
                (None, _) | (Some(_), SlotKind::Free) => {
                    return Err(Self::inconsistent(
                        set,
                        format!("slot {slot} kind disagrees with occupancy"),
                    ));
                }
                (Some(member), kind) => {
                    if slot >= geo.n && kind == SlotKind::Cache {
                        return Err(Self::inconsistent(
                            set,
                            format!("far slot {slot} typed as cache"),
                        ));
                    }
                    let count = self.slots.iter().filter(|s| s.member == Some(member)).count();
                    if count > 1 {
                        return Err(McError::DuplicateResidency {
                            page: geo.slot_addr(set, member) / geo.page_size,
                            count,
                        });
                    }
                    if self.members[member].slot != Some(slot) {
                        return Err(Self::inconsistent(
                            set,
                            format!("member {member} back-pointer stale"),
                        ));
                    }
                    let in_near_q = self.near_q.contains(member as u64);
                    let in_far_q = self.far_q.contains(member as u64);
                    if (slot < geo.n) != in_near_q || (slot >= geo.n) != in_far_q {
                        return Err(Self::inconsistent(
                            set,
                            format!("member {member} queued in the wrong tier"),
                        ));
                    }
                }
            }
        }
        for (member, entry) in self.members.iter().enumerate() {
            if let Some(block) = entry.dirty.first_not_in(&entry.valid) {
                return Err(McError::DirtyWithoutValid {
                    page: geo.slot_addr(set, member) / geo.page_size,
                    block,
                });
            }
            if entry.slot.is_none()
                && (self.near_q.contains(member as u64) || self.far_q.contains(member as u64))
            {
                return Err(Self::inconsistent(set, format!("unplaced member {member} is queued")));
            }
        }
        Ok(())
    }
}

/// Hot/cold tiered page table.
#[derive(Debug)]
pub struct HotColdTable {
    geo: Geometry,
    sets: Vec<Option<HotColdSet>>,
}

impl HotColdTable {
    /// Creates the table.
    ///
    /// Sets are materialized on first touch; an untouched set is indistinguishable
    /// from a freshly initialized one.
    ///
    /// # Arguments
    ///
    /// * `tiers` - Tier geometry.
    /// * `config` - Slots per set and hotness thresholds.
    ///
    /// # Returns
    ///
    /// An empty table.
    pub fn new(tiers: &TierConfig, config: &HotColdConfig) -> Self {
        let n = config.near_slots.max(1);
        let groups = tiers.far_groups().max(1) as usize;
        let sets = (tiers.near_size / (n as u64 * tiers.page_size)).max(1) as usize;
        let geo = Geometry {
            n,
            m: n * groups,
            page_size: tiers.page_size,
            block_size: tiers.block_size,
            near_size: tiers.near_size,
            decay_period: config.decay_period,
            touch_ceiling: config.touch_ceiling,
            swap_margin: config.swap_margin,
            blocks_per_page: tiers.blocks_per_page(),
        };
        Self {
            geo,
            sets: vec![None; sets],
        }
    }

    /// Returns the number of sets.
    pub fn sets(&self) -> usize {
        self.sets.len()
    }

    /// Returns `(near_slots, far_slots)` per set.
    pub fn slots_per_set(&self) -> (usize, usize) {
        (self.geo.n, self.geo.m)
    }

    /// Returns the `(set, member)` a physical address belongs to.
    pub fn locate(&self, addr: u64) -> (usize, usize) {
        self.geo.locate(addr)
    }

    /// Returns the physical base address of a slot's frame.
    pub fn slot_addr(&self, set: usize, slot: usize) -> u64 {
        self.geo.slot_addr(set, slot)
    }

    /// Returns the state of the member owning `addr`.
    pub fn member_view(&self, addr: u64) -> Option<MemberView> {
        let (set, member) = self.geo.locate(addr);
        let state = self.sets.get(set)?.as_ref()?;
        let entry = state.members[member];
        Some(MemberView {
            set,
            member,
            slot: entry.slot,
            kind: entry.slot.map(|s| state.slots[s].kind),
            valid: entry.valid,
            dirty: entry.dirty,
            counter: entry.counter,
        })
    }

    /// Returns `(memory, cache, free)` near-slot counts of a set.
    pub fn near_counts(&self, set: usize) -> (usize, usize, usize) {
        self.sets
            .get(set)
            .and_then(Option::as_ref)
            .map_or((0, 0, self.geo.n), |s| s.counts(&self.geo))
    }

    /// Returns the members queued in the near and far queues of a set, front first.
    pub fn queues(&self, set: usize) -> (Vec<u64>, Vec<u64>) {
        self.sets
            .get(set)
            .and_then(Option::as_ref)
            .map_or((Vec::new(), Vec::new()), |s| {
                (
                    s.near_q.iter().map(|e| e.page).collect(),
                    s.far_q.iter().map(|e| e.page).collect(),
                )
            })
    }
}

impl PlacementEngine for HotColdTable {
    fn name(&self) -> &'static str {
        "HotCold"
    }

    fn classify_and_migrate(
        &mut self,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<Outcome, McError> {
        let geo = self.geo;
        let addr = req.addr.val();
        let (set, member) = geo.locate(addr);
        let block = req.addr.block(geo.page_size, geo.block_size);
        let state = self
            .sets
            .get_mut(set)
            .ok_or(McError::SlotNotFound {
                set,
                page: req.addr.page(geo.page_size),
            })?
            .get_or_insert_with(|| HotColdSet::new(&geo));
        state.handle(&geo, set, member, block, req, ports)
    }

    fn check_invariants(&self) -> Result<(), McError> {
        for (set, state) in self.sets.iter().enumerate() {
            if let Some(state) = state {
                state.check(&self.geo, set)?;
            }
        }
        Ok(())
    }
}
