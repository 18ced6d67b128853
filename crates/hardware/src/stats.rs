//! Controller statistics collection and reporting.
//!
//! This module tracks the aggregate behaviour of one memory controller. It provides:
//! 1. **Requests:** Total requests handled and write-backs received.
//! 2. **Service:** Accesses served by the near and far tiers.
//! 3. **Slot table:** Block hits, block misses, slot misses and placements.
//! 4. **Movement:** Evictions (clean/dirty), written-back blocks, migrations, swaps, demotions.

use std::time::Instant;

use crate::mc::request::ReqType;
use crate::placement::{Lookup, Outcome, Tier};
use crate::soc::memory::device::DeviceStats;

/// Aggregate counters of one controller.
#[derive(Clone, Debug)]
pub struct McStats {
    start_time: Instant,
    /// Requests handled, excluding clean write-backs (PUTS).
    pub requests: u64,
    /// Dirty write-backs (PUTX) received.
    pub writebacks: u64,
    /// Clean write-backs (PUTS) acknowledged without work.
    pub clean_writebacks: u64,

    /// Requests whose data came from the near tier.
    pub near_served: u64,
    /// Requests whose data came from the far tier.
    pub far_served: u64,

    /// Page resident and block valid.
    pub block_hits: u64,
    /// Page resident, block not yet valid.
    pub block_misses: u64,
    /// Page not resident in any slot.
    pub slot_misses: u64,
    /// Free slots assigned.
    pub placements: u64,

    /// Evictions that wrote nothing back.
    pub clean_evictions: u64,
    /// Evictions that wrote blocks back.
    pub dirty_evictions: u64,
    /// Blocks written back by evictions.
    pub written_back_blocks: u64,
    /// Pages promoted into the near tier.
    pub migrations: u64,
    /// Near/far page exchanges.
    pub swaps: u64,
    /// Pages demoted or reclassified colder.
    pub demotions: u64,
}

impl Default for McStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            requests: 0,
            writebacks: 0,
            clean_writebacks: 0,
            near_served: 0,
            far_served: 0,
            block_hits: 0,
            block_misses: 0,
            slot_misses: 0,
            placements: 0,
            clean_evictions: 0,
            dirty_evictions: 0,
            written_back_blocks: 0,
            migrations: 0,
            swaps: 0,
            demotions: 0,
        }
    }
}

impl McStats {
    /// Accounts one handled request.
    ///
    /// # Arguments
    ///
    /// * `req_type` - The request's type.
    /// * `outcome` - What the placement engine did.
    pub fn apply(&mut self, req_type: ReqType, outcome: &Outcome) {
        self.requests += 1;
        if req_type == ReqType::Putx {
            self.writebacks += 1;
        }
        match outcome.served_by {
            Tier::Near => self.near_served += 1,
            Tier::Far => self.far_served += 1,
        }
        match outcome.lookup {
            Lookup::BlockHit => self.block_hits += 1,
            Lookup::BlockMiss => self.block_misses += 1,
            Lookup::SlotMiss => self.slot_misses += 1,
            Lookup::Untracked => {}
        }
        if outcome.placed {
            self.placements += 1;
        }
        self.clean_evictions += u64::from(outcome.clean_evictions);
        self.dirty_evictions += u64::from(outcome.dirty_evictions);
        self.written_back_blocks += outcome.written_back_blocks;
        self.migrations += u64::from(outcome.migrations);
        self.swaps += u64::from(outcome.swaps);
        self.demotions += u64::from(outcome.demotions);
    }

    /// Fraction of requests served by the near tier.
    pub fn near_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.near_served as f64 / self.requests as f64
        }
    }

    /// Fraction of tracked lookups that found the page resident.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.block_hits + self.block_misses;
        let total = hits + self.slot_misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Prints the report followed by per-device counters.
    ///
    /// # Arguments
    ///
    /// * `scheme` - Name of the active placement scheme.
    /// * `devices` - `(name, counters)` for every device.
    pub fn print(&self, scheme: &str, devices: &[(String, DeviceStats)]) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let pct = |n: u64| {
            if self.requests == 0 {
                0.0
            } else {
                n as f64 / self.requests as f64 * 100.0
            }
        };

        println!("\n==========================================================");
        println!("TIERED MEMORY CONTROLLER STATISTICS");
        println!("==========================================================");
        println!("scheme                   {}", scheme);
        println!("host_seconds             {:.4} s", seconds);
        println!("requests                 {}", self.requests);
        println!("writebacks.dirty         {}", self.writebacks);
        println!("writebacks.clean         {}", self.clean_writebacks);
        println!("----------------------------------------------------------");
        println!("SERVICE");
        println!("  near                   {} ({:.2}%)", self.near_served, pct(self.near_served));
        println!("  far                    {} ({:.2}%)", self.far_served, pct(self.far_served));
        println!("----------------------------------------------------------");
        println!("SLOT TABLE");
        println!("  block_hits             {}", self.block_hits);
        println!("  block_misses           {}", self.block_misses);
        println!("  slot_misses            {}", self.slot_misses);
        println!("  hit_rate               {:.2}%", self.hit_rate() * 100.0);
        println!("  placements             {}", self.placements);
        println!("----------------------------------------------------------");
        println!("MOVEMENT");
        println!("  evictions.clean        {}", self.clean_evictions);
        println!("  evictions.dirty        {}", self.dirty_evictions);
        println!("  blocks_written_back    {}", self.written_back_blocks);
        println!("  migrations             {}", self.migrations);
        println!("  swaps                  {}", self.swaps);
        println!("  demotions              {}", self.demotions);
        if !devices.is_empty() {
            println!("----------------------------------------------------------");
            println!("DEVICES");
            for (name, s) in devices {
                println!(
                    "  {:<22} reads={} writes={} lines={}",
                    name, s.reads, s.writes, s.lines
                );
            }
        }
        println!("==========================================================");
    }
}
