//! Tiered page placement engines.
//!
//! Each engine owns its slot table, hotness state and relocation records, and
//! decides per request where the data is served from and which pages move. It
//! provides:
//! 1. **PlacementEngine:** The single decision capability, `classify_and_migrate`.
//! 2. **Outcome:** What happened, returned to the dispatcher for accounting.
//! 3. **Engines:** LRU table, hot/cold table, ratio-controlled table and two static layouts.
//!
//! Engines never lock and never touch statistics; the dispatcher owns both.

/// Per-page block bitmaps.
pub mod blocks;

/// Hot/cold page table with near/far queues.
pub mod hot_cold;

/// Decay clock and hotness queues.
pub mod hotness;

/// Set-associative LRU table with migrate-or-evict decisions.
pub mod lru_table;

/// Near-access-ratio-controlled swapping table.
pub mod ratio;

/// Page relocation records.
pub mod remap;

/// Far-only and flat static layouts.
pub mod static_map;

pub use hot_cold::HotColdTable;
pub use lru_table::LruTable;
pub use ratio::RatioTable;
pub use static_map::{FarOnly, FlatMap};

use crate::common::error::{ConfigError, McError};
use crate::config::{Config, Scheme};
use crate::mc::request::TierRequest;
use crate::soc::memory::ports::TierPorts;

/// Tier that supplied the requested data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Fast, capacity-limited tier.
    Near,
    /// Slow, large tier.
    Far,
}

/// Classification of a request against the slot table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// Page resident in a slot and the block valid.
    BlockHit,
    /// Page resident in a slot but the block not yet valid.
    BlockMiss,
    /// Page not resident in any slot.
    SlotMiss,
    /// The scheme keeps no slot table.
    Untracked,
}

/// Result of one placement decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Cycle at which the requested data is available.
    pub ready: u64,
    /// Tier that served the data.
    pub served_by: Tier,
    /// Slot table classification.
    pub lookup: Lookup,
    /// A free slot was assigned to the requested page.
    pub placed: bool,
    /// Evictions that wrote nothing back.
    pub clean_evictions: u32,
    /// Evictions that wrote dirty blocks back.
    pub dirty_evictions: u32,
    /// Blocks written back by evictions.
    pub written_back_blocks: u64,
    /// Pages promoted into the near tier.
    pub migrations: u32,
    /// Near/far page exchanges.
    pub swaps: u32,
    /// Pages moved back to their far home or reclassified colder.
    pub demotions: u32,
}

impl Outcome {
    /// Creates an outcome with no side events.
    ///
    /// # Arguments
    ///
    /// * `ready` - Data-ready cycle.
    /// * `served_by` - Tier that supplied the data.
    /// * `lookup` - Slot table classification.
    ///
    /// # Returns
    ///
    /// A new `Outcome`.
    pub fn new(ready: u64, served_by: Tier, lookup: Lookup) -> Self {
        Self {
            ready,
            served_by,
            lookup,
            placed: false,
            clean_evictions: 0,
            dirty_evictions: 0,
            written_back_blocks: 0,
            migrations: 0,
            swaps: 0,
            demotions: 0,
        }
    }

    /// Records one eviction that wrote back `dirty_blocks` blocks.
    pub fn record_eviction(&mut self, dirty_blocks: usize) {
        if dirty_blocks == 0 {
            self.clean_evictions += 1;
        } else {
            self.dirty_evictions += 1;
            self.written_back_blocks += dirty_blocks as u64;
        }
    }
}

/// Trait for tiered placement engines.
///
/// One engine is selected at construction and serves every request of its controller.
pub trait PlacementEngine: Send {
    /// Returns the scheme name.
    fn name(&self) -> &'static str;

    /// Classifies the request, updates metadata, issues device accesses and
    /// performs any migration the policy triggers.
    ///
    /// # Arguments
    ///
    /// * `req` - Translated request.
    /// * `ports` - Near and far devices.
    ///
    /// # Returns
    ///
    /// The outcome, or an internal invariant violation.
    fn classify_and_migrate(
        &mut self,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<Outcome, McError>;

    /// Verifies the metadata invariants of the whole table.
    fn check_invariants(&self) -> Result<(), McError>;
}

/// Builds the engine selected by `config.scheme`.
///
/// # Arguments
///
/// * `config` - Validated configuration.
///
/// # Returns
///
/// The boxed engine, or the configuration error that prevents laying it out.
pub fn build(config: &Config) -> Result<Box<dyn PlacementEngine>, ConfigError> {
    config.validate()?;
    let engine: Box<dyn PlacementEngine> = match config.scheme {
        Scheme::FarOnly => Box::new(FarOnly::new(&config.tiers)),
        Scheme::Flat => Box::new(FlatMap::new(&config.tiers)),
        Scheme::LruTable => Box::new(LruTable::new(&config.tiers, &config.lru)),
        Scheme::HotCold => Box::new(HotColdTable::new(&config.tiers, &config.hot_cold)),
        Scheme::Ratio => Box::new(RatioTable::new(&config.tiers, &config.ratio)),
    };
    Ok(engine)
}
