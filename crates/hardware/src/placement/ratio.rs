//! Near-access-ratio-controlled swapping table.
//!
//! Every near frame heads a group of `R + 1` pages: the near-home page (member `R`)
//! and `R` far companions (members `0..R`, one per far region of `near_size` bytes).
//! The group keeps one page in the near frame and the rest in its `R` far slots.
//!
//! A global near-access ratio steers swapping:
//! 1. **Below the band:** far accesses may pull their page into the near frame.
//! 2. **Above the band:** near accesses may push a lukewarm resident out in favour of
//!    a colder companion, shedding near-tier bandwidth.
//! 3. **Inside the band:** no swaps.
//!
//! Every `stable_window` cycles the counters are rescaled: reset when the ratio
//! undershot, divided when it overshot.

use tracing::debug;

use crate::common::constants::LINE_SIZE;
use crate::common::error::McError;
use crate::config::{RatioConfig, TierConfig};
use crate::mc::request::TierRequest;
use crate::soc::memory::device::{AccessKind, QueueHint};
use crate::soc::memory::ports::TierPorts;

use super::blocks::BlockMap;
use super::{Lookup, Outcome, PlacementEngine, Tier};

#[derive(Clone, Debug)]
struct RatioGroup {
    near_member: usize,
    far_slots: Vec<usize>,
    allocated: bool,
    hotness: Vec<u64>,
    valid: Vec<BlockMap>,
}

impl RatioGroup {
    fn new(companions: usize) -> Self {
        Self {
            near_member: companions,
            far_slots: (0..companions).collect(),
            allocated: false,
            hotness: vec![0; companions + 1],
            valid: vec![BlockMap::EMPTY; companions + 1],
        }
    }

    fn far_slot_of(&self, member: usize) -> Option<usize> {
        self.far_slots.iter().position(|&m| m == member)
    }
}

/// Placement of one group member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Residence {
    /// In the group's near frame.
    Near,
    /// In far slot `j` of the group.
    Far(usize),
}

/// Global near/total access counters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RatioCounters {
    /// Accesses served by the near tier since the last reset.
    pub near_accesses: u64,
    /// All accesses since the last reset.
    pub total_accesses: u64,
    /// `near_accesses / total_accesses`, or zero.
    pub current_ratio: f64,
    /// Cycle of the last rescale check that fired.
    pub last_rescale: u64,
}

impl RatioCounters {
    fn record(&mut self, near: bool) {
        if near {
            self.near_accesses += 1;
        }
        self.total_accesses += 1;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.current_ratio = if self.total_accesses == 0 {
            0.0
        } else {
            self.near_accesses as f64 / self.total_accesses as f64
        };
    }
}

/// Ratio-controlled tiered page table.
#[derive(Debug)]
pub struct RatioTable {
    groups: Vec<Option<Box<RatioGroup>>>,
    companions: usize,
    page_size: u64,
    block_size: u64,
    near_size: u64,
    metadata_read_latency: u64,
    metadata_write_latency: u64,
    target: f64,
    band: f64,
    hot_threshold: u64,
    stable_window: u64,
    rescale_divisor: u64,
    counters: RatioCounters,
}

impl RatioTable {
    /// Creates the table with every page at home.
    ///
    /// # Arguments
    ///
    /// * `tiers` - Tier geometry; `far_size` must be a multiple of `near_size`.
    /// * `config` - Target ratio, band and rescale parameters.
    ///
    /// # Returns
    ///
    /// A new `RatioTable`.
    pub fn new(tiers: &TierConfig, config: &RatioConfig) -> Self {
        let groups = tiers.near_frames() as usize;
        Self {
            groups: vec![None; groups],
            companions: tiers.far_groups() as usize,
            page_size: tiers.page_size,
            block_size: tiers.block_size,
            near_size: tiers.near_size,
            metadata_read_latency: tiers.metadata_read_latency,
            metadata_write_latency: tiers.metadata_write_latency,
            target: config.target,
            band: config.band,
            hot_threshold: config.hot_threshold,
            stable_window: config.stable_window,
            rescale_divisor: config.rescale_divisor.max(1),
            counters: RatioCounters::default(),
        }
    }

    /// Returns the current near-access ratio.
    pub fn current_ratio(&self) -> f64 {
        self.counters.current_ratio
    }

    /// Returns the global access counters.
    pub fn counters(&self) -> RatioCounters {
        self.counters
    }

    /// Returns the number of far companions per near frame.
    pub fn companions(&self) -> usize {
        self.companions
    }

    /// Maps a physical address to `(group, member, block)`.
    pub fn locate(&self, addr: u64) -> (usize, usize, usize) {
        let block = (addr % self.page_size / self.block_size) as usize;
        if addr < self.near_size {
            ((addr / self.page_size) as usize, self.companions, block)
        } else {
            let far = addr - self.near_size;
            (
                (far % self.near_size / self.page_size) as usize,
                (far / self.near_size) as usize,
                block,
            )
        }
    }

    /// Returns where the page containing `addr` lives.
    pub fn residence(&self, addr: u64) -> Option<Residence> {
        let (group, member, _) = self.locate(addr);
        match self.groups.get(group)? {
            None if member == self.companions => Some(Residence::Near),
            None => Some(Residence::Far(member)),
            Some(g) if g.near_member == member => Some(Residence::Near),
            Some(g) => g.far_slot_of(member).map(Residence::Far),
        }
    }

    /// Returns the hotness counter of the page containing `addr`.
    pub fn hotness(&self, addr: u64) -> u64 {
        let (group, member, _) = self.locate(addr);
        self.groups
            .get(group)
            .and_then(Option::as_ref)
            .map_or(0, |g| g.hotness[member])
    }

    fn in_band(&self) -> bool {
        let r = self.counters.current_ratio;
        r >= self.target - self.band && r <= self.target + self.band
    }

    fn maybe_rescale(&mut self, now: u64) {
        if now.saturating_sub(self.counters.last_rescale) < self.stable_window {
            return;
        }
        self.counters.last_rescale = now;
        let before = self.counters.current_ratio;
        if before < self.target - self.band {
            self.counters.near_accesses = 0;
            self.counters.total_accesses = 0;
        } else if before > self.target + self.band {
            self.counters.near_accesses /= self.rescale_divisor;
            self.counters.total_accesses /= self.rescale_divisor;
        } else {
            return;
        }
        self.counters.refresh();
        debug!(before, after = self.counters.current_ratio, "ratio: rescaled access counters");
    }

    fn near_addr(&self, group: usize) -> u64 {
        group as u64 * self.page_size
    }

    fn far_addr(&self, group: usize, slot: usize) -> u64 {
        self.near_size + slot as u64 * self.near_size + group as u64 * self.page_size
    }

    fn block_lines(&self) -> u32 {
        (self.block_size / LINE_SIZE).max(1) as u32
    }

    fn lines(&self, blocks: &BlockMap) -> Option<u32> {
        let n = blocks.count() as u64;
        (n > 0).then(|| (n * self.block_size / LINE_SIZE).max(1) as u32)
    }

    /// Exchanges the near-frame page with the page in far slot `slot`, moving valid blocks only.
    fn swap(
        &self,
        group: &mut RatioGroup,
        index: usize,
        slot: usize,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) {
        let incoming = group.far_slots[slot];
        let outgoing = group.near_member;
        let near = self.near_addr(index);
        let far = self.far_addr(index, slot);
        if let Some(lines) = self.lines(&group.valid[incoming]) {
            let _ = ports.far(req, far, AccessKind::Read, QueueHint::Background, lines);
            let _ = ports.near(req, near, AccessKind::Write, QueueHint::Background, lines);
        }
        if group.allocated
            && let Some(lines) = self.lines(&group.valid[outgoing])
        {
            let _ = ports.near(req, near, AccessKind::Read, QueueHint::Background, lines);
            let _ = ports.far(req, far, AccessKind::Write, QueueHint::Background, lines);
        }
        group.far_slots[slot] = outgoing;
        group.near_member = incoming;
        group.allocated = true;
    }

    #[allow(clippy::too_many_arguments)]
    fn serve_near(
        &self,
        group: &mut RatioGroup,
        index: usize,
        member: usize,
        block: usize,
        banned: bool,
        req: &TierRequest,
        ports: &mut TierPorts,
        outcome: &mut Outcome,
    ) -> bool {
        let hot = group.hotness[member];
        if self.counters.current_ratio <= self.target + self.band
            || hot > self.hot_threshold
            || banned
        {
            return false;
        }
        let mut best: Option<(usize, u64)> = None;
        for (slot, &m) in group.far_slots.iter().enumerate() {
            let h = group.hotness[m];
            if h < hot && h > best.map_or(0, |(_, b)| b) {
                best = Some((slot, h));
            }
        }
        let Some((slot, _)) = best else {
            return false;
        };
        self.swap(group, index, slot, req, ports);
        outcome.swaps += 1;
        outcome.demotions += 1;
        debug!(group = index, member, block, to = slot, "ratio: demoted near resident");
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn serve_far(
        &self,
        group: &mut RatioGroup,
        index: usize,
        member: usize,
        slot: usize,
        banned: bool,
        req: &TierRequest,
        ports: &mut TierPorts,
        outcome: &mut Outcome,
    ) -> bool {
        if self.counters.current_ratio >= self.target - self.band || banned {
            return false;
        }
        if !group.allocated {
            self.swap(group, index, slot, req, ports);
            outcome.migrations += 1;
            debug!(group = index, member, from = slot, "ratio: migrated into free near frame");
            return true;
        }
        if group.hotness[member] > group.hotness[group.near_member] {
            self.swap(group, index, slot, req, ports);
            outcome.swaps += 1;
            debug!(group = index, member, from = slot, "ratio: promoted hotter companion");
            return true;
        }
        false
    }
}

impl PlacementEngine for RatioTable {
    fn name(&self) -> &'static str {
        "Ratio"
    }

    fn classify_and_migrate(
        &mut self,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<Outcome, McError> {
        self.maybe_rescale(req.cycle);
        let banned = self.in_band();
        let (index, member, block) = self.locate(req.addr.val());
        let companions = self.companions;
        let mut group = self
            .groups
            .get_mut(index)
            .ok_or(McError::SlotNotFound {
                set: index,
                page: req.addr.page(self.page_size),
            })?
            .take()
            .unwrap_or_else(|| Box::new(RatioGroup::new(companions)));

        let kind = if req.write {
            AccessKind::Write
        } else {
            AccessKind::Read
        };
        let offset = block as u64 * self.block_size;
        let lookup = if group.valid[member].get(block) {
            Lookup::BlockHit
        } else {
            Lookup::BlockMiss
        };

        let mut outcome;
        let changed;
        if group.near_member == member {
            let addr = self.near_addr(index) + offset;
            let ready = ports.near(req, addr, kind, QueueHint::Immediate, self.block_lines());
            outcome = Outcome::new(ready, Tier::Near, lookup);
            self.counters.record(true);
            group.hotness[member] += 1;
            group.valid[member].set(block);
            outcome.placed = !group.allocated;
            group.allocated = true;
            changed = self.serve_near(
                &mut group,
                index,
                member,
                block,
                banned,
                req,
                ports,
                &mut outcome,
            );
        } else {
            let Some(slot) = group.far_slot_of(member) else {
                self.groups[index] = Some(group);
                return Err(McError::SlotNotFound {
                    set: index,
                    page: req.addr.page(self.page_size),
                });
            };
            let addr = self.far_addr(index, slot) + offset;
            let ready = ports.far(req, addr, kind, QueueHint::Immediate, self.block_lines());
            outcome = Outcome::new(ready, Tier::Far, lookup);
            self.counters.record(false);
            group.hotness[member] += 1;
            group.valid[member].set(block);
            changed = self.serve_far(
                &mut group,
                index,
                member,
                slot,
                banned,
                req,
                ports,
                &mut outcome,
            );
        }
        self.groups[index] = Some(group);

        outcome.ready += self.metadata_read_latency;
        if changed {
            outcome.ready += self.metadata_write_latency;
        }
        Ok(outcome)
    }

    fn check_invariants(&self) -> Result<(), McError> {
        let mut seen = vec![0usize; self.companions + 1];
        for (index, group) in self.groups.iter().enumerate() {
            let Some(group) = group else { continue };
            seen.iter_mut().for_each(|c| *c = 0);
            for &m in group.far_slots.iter().chain(std::iter::once(&group.near_member)) {
                match seen.get_mut(m) {
                    Some(c) => *c += 1,
                    None => {
                        return Err(McError::SlotNotFound {
                            set: index,
                            page: m as u64,
                        });
                    }
                }
            }
            if let Some(member) = seen.iter().position(|&c| c != 1) {
                let page = if member == self.companions {
                    self.near_addr(index)
                } else {
                    self.far_addr(index, member)
                } / self.page_size;
                return Err(McError::DuplicateResidency {
                    page,
                    count: seen[member],
                });
            }
        }
        let r = self.counters.current_ratio;
        if !(0.0..=1.0).contains(&r) || self.counters.near_accesses > self.counters.total_accesses {
            return Err(McError::QueueInconsistent {
                set: 0,
                detail: format!("near-access ratio {r} out of range"),
            });
        }
        Ok(())
    }
}
