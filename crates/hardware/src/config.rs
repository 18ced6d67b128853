//! Configuration system for the tiered memory controller.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the controller. It provides:
//! 1. **Defaults:** Baseline tier geometry, device timing and policy thresholds.
//! 2. **Structures:** Hierarchical config for general options, tiers, devices and each placement scheme.
//! 3. **Enums:** Placement scheme and device timing model types.
//! 4. **Validation:** Geometry checks that reject impossible layouts before any table is built.
//!
//! Configuration is supplied as JSON (every field optional) or built with `Config::default()`.

use serde::{Deserialize, Serialize};

use crate::common::constants::LINE_SIZE;
use crate::common::error::ConfigError;
use crate::placement::blocks::MAX_BLOCKS;

/// Default configuration constants for the controller.
mod defaults {
    /// Total physical memory, near plus far (9 GiB).
    pub const TOTAL_SIZE: u64 = 9 * 1024 * 1024 * 1024;

    /// Near-tier capacity (1 GiB).
    pub const NEAR_SIZE: u64 = 1024 * 1024 * 1024;

    /// Number of independent near-tier channels.
    pub const NEAR_CHANNELS: usize = 4;

    /// Migration granularity in bytes (4 KiB).
    pub const PAGE_SIZE: u64 = 4096;

    /// Valid/dirty tracking granularity in bytes.
    pub const BLOCK_SIZE: u64 = 64;

    /// Cycles to read placement metadata kept in the near tier.
    pub const METADATA_READ_LATENCY: u64 = 10;

    /// Cycles to write back modified placement metadata.
    pub const METADATA_WRITE_LATENCY: u64 = 10;

    /// Fixed near-tier access latency in cycles.
    pub const NEAR_LATENCY: u64 = 60;

    /// Fixed far-tier access latency in cycles.
    pub const FAR_LATENCY: u64 = 120;

    /// Additional near-tier cycles per extra line in a burst.
    pub const NEAR_LINE_LATENCY: u64 = 1;

    /// Additional far-tier cycles per extra line in a burst.
    pub const FAR_LINE_LATENCY: u64 = 4;

    /// CAS (Column Access Strobe) latency in device cycles.
    pub const T_CAS: u64 = 14;

    /// RAS (Row Access Strobe) latency in device cycles.
    pub const T_RAS: u64 = 14;

    /// Precharge latency in device cycles.
    pub const T_PRE: u64 = 14;

    /// Row buffer size in bytes.
    pub const ROW_BYTES: u64 = 2048;

    /// Size of the near-tier region used as a page cache by the LRU table (64 MiB).
    pub const LRU_CACHE_SIZE: u64 = 64 * 1024 * 1024;

    /// LRU table associativity.
    pub const LRU_WAYS: usize = 8;

    /// Width of the short miss-rate window in cycles.
    pub const LRU_MISS_WINDOW: u64 = 10_000;

    /// Hotness decay period in cycles.
    pub const DECAY_PERIOD: u64 = 1_000;

    /// Near slots per hot/cold set.
    pub const HOT_COLD_NEAR_SLOTS: usize = 4;

    /// Touches tolerated before the coldest near page is examined for eviction.
    pub const HOT_COLD_TOUCH_CEILING: u64 = 4;

    /// Hotness margin by which a far page must beat a near page to swap.
    pub const HOT_COLD_SWAP_MARGIN: u64 = 10;

    /// Desired fraction of accesses served by the near tier.
    pub const RATIO_TARGET: f64 = 0.8;

    /// Half-width of the hysteresis band around the target ratio.
    pub const RATIO_BAND: f64 = 0.05;

    /// Near-resident pages hotter than this are never demoted.
    pub const RATIO_HOT_THRESHOLD: u64 = 64;

    /// Cycles between access-counter rescales.
    pub const RATIO_STABLE_WINDOW: u64 = 1_000_000;

    /// Divisor applied to the access counters when the ratio overshoots.
    pub const RATIO_RESCALE_DIVISOR: u64 = 8;

    /// Records buffered before the trace file is flushed.
    pub const TRACE_FLUSH_EVERY: usize = 10_000;
}

/// Page placement schemes.
///
/// Selected once at construction; every request is routed to the same engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum Scheme {
    /// Every request is served by the far tier; the near tier is unused.
    #[serde(alias = "NoCache")]
    FarOnly,
    /// Static split: the top of the physical space lives in the near tier.
    #[serde(alias = "DirectFlat")]
    Flat,
    /// Set-associative page table with LRU victims and a migrate-or-evict cost model.
    #[default]
    #[serde(alias = "Hybrid2")]
    LruTable,
    /// Near/far slot table with hotness queues, demotion and hot/cold swaps.
    #[serde(alias = "Bumblebee")]
    HotCold,
    /// Near frames grouped with far companions; swaps gated by the global near-access ratio.
    #[serde(alias = "BATMAN", alias = "Batman")]
    Ratio,
}

impl Scheme {
    /// Returns the scheme name as written in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FarOnly => "FarOnly",
            Self::Flat => "Flat",
            Self::LruTable => "LruTable",
            Self::HotCold => "HotCold",
            Self::Ratio => "Ratio",
        }
    }
}

/// Device timing model types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum DeviceModel {
    /// Fixed latency per access plus a per-line burst cost.
    #[default]
    Simple,
    /// Open-row buffer with CAS, RAS and precharge latencies.
    #[serde(alias = "DRAM")]
    Dram,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use tiersim_core::config::{Config, Scheme};
///
/// let json = r#"{
///     "scheme": "Bumblebee",
///     "tiers": { "near_size": 1048576, "total_size": 9437184 },
///     "hot_cold": { "near_slots": 4 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.scheme, Scheme::HotCold);
/// assert_eq!(config.tiers.page_size, 4096);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// General options
    #[serde(default)]
    pub general: GeneralConfig,
    /// Tier geometry and device timing
    #[serde(default)]
    pub tiers: TierConfig,
    /// Placement scheme
    #[serde(default)]
    pub scheme: Scheme,
    /// LRU table parameters
    #[serde(default)]
    pub lru: LruTableConfig,
    /// Hot/cold table parameters
    #[serde(default)]
    pub hot_cold: HotColdConfig,
    /// Ratio-controlled table parameters
    #[serde(default)]
    pub ratio: RatioConfig,
}

impl Config {
    /// Checks that the configured geometry can be laid out for the selected scheme.
    ///
    /// # Returns
    ///
    /// `Ok(())` when every table can be sized exactly, otherwise the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tiers;
        non_zero("tiers.total_size", t.total_size)?;
        non_zero("tiers.near_size", t.near_size)?;
        non_zero("tiers.page_size", t.page_size)?;
        non_zero("tiers.block_size", t.block_size)?;
        non_zero("tiers.near_channels", t.near_channels as u64)?;
        multiple_of("tiers.block_size", t.block_size, "line size", LINE_SIZE)?;
        multiple_of("tiers.page_size", t.page_size, "tiers.block_size", t.block_size)?;
        multiple_of("tiers.near_size", t.near_size, "tiers.page_size", t.page_size)?;
        multiple_of("tiers.total_size", t.total_size, "tiers.page_size", t.page_size)?;
        if t.near_size >= t.total_size {
            return Err(ConfigError::NearTooLarge {
                near: t.near_size,
                total: t.total_size,
            });
        }
        let blocks = t.blocks_per_page() as u64;
        if blocks > MAX_BLOCKS as u64 {
            return Err(ConfigError::TooManyBlocks {
                blocks,
                max: MAX_BLOCKS as u64,
            });
        }

        match self.scheme {
            Scheme::FarOnly | Scheme::Flat => Ok(()),
            Scheme::LruTable => {
                let l = &self.lru;
                non_zero("lru.ways", l.ways as u64)?;
                non_zero("lru.cache_size", l.cache_size)?;
                multiple_of(
                    "lru.cache_size",
                    l.cache_size,
                    "lru.ways * tiers.page_size",
                    l.ways as u64 * t.page_size,
                )
            }
            Scheme::HotCold => {
                let h = &self.hot_cold;
                non_zero("hot_cold.near_slots", h.near_slots as u64)?;
                non_zero("hot_cold.decay_period", h.decay_period)?;
                multiple_of(
                    "tiers.near_size",
                    t.near_size,
                    "hot_cold.near_slots * tiers.page_size",
                    h.near_slots as u64 * t.page_size,
                )?;
                multiple_of("far tier size", t.far_size(), "tiers.near_size", t.near_size)
            }
            Scheme::Ratio => {
                let r = &self.ratio;
                multiple_of("far tier size", t.far_size(), "tiers.near_size", t.near_size)?;
                non_zero("ratio.stable_window", r.stable_window)?;
                non_zero("ratio.rescale_divisor", r.rescale_divisor)?;
                if !(r.target > 0.0 && r.target < 1.0) {
                    return Err(ConfigError::OutOfRange {
                        field: "ratio.target",
                        value: r.target,
                        range: "(0, 1)",
                    });
                }
                if !(r.band >= 0.0 && r.target - r.band > 0.0 && r.target + r.band < 1.0) {
                    return Err(ConfigError::OutOfRange {
                        field: "ratio.band",
                        value: r.band,
                        range: "[0, min(target, 1 - target))",
                    });
                }
                Ok(())
            }
        }
    }
}

fn non_zero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    Ok(())
}

fn multiple_of(
    field: &'static str,
    value: u64,
    unit: &'static str,
    unit_value: u64,
) -> Result<(), ConfigError> {
    if unit_value == 0 || value % unit_value != 0 || value < unit_value {
        return Err(ConfigError::NotMultiple {
            field,
            value,
            unit,
            unit_value,
        });
    }
    Ok(())
}

/// General options.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Record every serialized request to a plain-text trace file
    #[serde(default)]
    pub trace_enabled: bool,

    /// Directory the trace file is created in
    #[serde(default = "GeneralConfig::default_trace_dir")]
    pub trace_dir: String,

    /// Controller name, used as the trace file prefix
    #[serde(default = "GeneralConfig::default_name")]
    pub name: String,

    /// Records buffered between trace flushes
    #[serde(default = "GeneralConfig::default_trace_flush_every")]
    pub trace_flush_every: usize,
}

impl GeneralConfig {
    fn default_trace_dir() -> String {
        ".".to_string()
    }

    fn default_name() -> String {
        "mem".to_string()
    }

    fn default_trace_flush_every() -> usize {
        defaults::TRACE_FLUSH_EVERY
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace_enabled: false,
            trace_dir: Self::default_trace_dir(),
            name: Self::default_name(),
            trace_flush_every: defaults::TRACE_FLUSH_EVERY,
        }
    }
}

/// Tier geometry and device configuration.
///
/// Physical addresses `[0, near_size)` are homed in the near tier and
/// `[near_size, total_size)` in the far tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TierConfig {
    /// Total physical memory (near plus far) in bytes
    #[serde(default = "TierConfig::default_total_size")]
    pub total_size: u64,

    /// Near-tier capacity in bytes
    #[serde(default = "TierConfig::default_near_size")]
    pub near_size: u64,

    /// Number of near-tier channels
    #[serde(default = "TierConfig::default_near_channels")]
    pub near_channels: usize,

    /// Migration granularity in bytes
    #[serde(default = "TierConfig::default_page_size")]
    pub page_size: u64,

    /// Valid/dirty tracking granularity in bytes
    #[serde(default = "TierConfig::default_block_size")]
    pub block_size: u64,

    /// Cycles to read metadata kept in the near tier
    #[serde(default = "TierConfig::default_metadata_read_latency")]
    pub metadata_read_latency: u64,

    /// Cycles to write modified metadata
    #[serde(default = "TierConfig::default_metadata_write_latency")]
    pub metadata_write_latency: u64,

    /// Near-tier device timing
    #[serde(default = "DeviceConfig::near")]
    pub near: DeviceConfig,

    /// Far-tier device timing
    #[serde(default = "DeviceConfig::far")]
    pub far: DeviceConfig,
}

impl TierConfig {
    fn default_total_size() -> u64 {
        defaults::TOTAL_SIZE
    }

    fn default_near_size() -> u64 {
        defaults::NEAR_SIZE
    }

    fn default_near_channels() -> usize {
        defaults::NEAR_CHANNELS
    }

    fn default_page_size() -> u64 {
        defaults::PAGE_SIZE
    }

    fn default_block_size() -> u64 {
        defaults::BLOCK_SIZE
    }

    fn default_metadata_read_latency() -> u64 {
        defaults::METADATA_READ_LATENCY
    }

    fn default_metadata_write_latency() -> u64 {
        defaults::METADATA_WRITE_LATENCY
    }

    /// Returns the far-tier capacity in bytes.
    pub fn far_size(&self) -> u64 {
        self.total_size.saturating_sub(self.near_size)
    }

    /// Returns the number of tracked blocks in one page.
    pub fn blocks_per_page(&self) -> usize {
        (self.page_size / self.block_size.max(1)) as usize
    }

    /// Returns the number of page frames in the near tier.
    pub fn near_frames(&self) -> u64 {
        self.near_size / self.page_size.max(1)
    }

    /// Returns how many near-tier-sized groups the far tier holds.
    pub fn far_groups(&self) -> u64 {
        self.far_size() / self.near_size.max(1)
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            total_size: defaults::TOTAL_SIZE,
            near_size: defaults::NEAR_SIZE,
            near_channels: defaults::NEAR_CHANNELS,
            page_size: defaults::PAGE_SIZE,
            block_size: defaults::BLOCK_SIZE,
            metadata_read_latency: defaults::METADATA_READ_LATENCY,
            metadata_write_latency: defaults::METADATA_WRITE_LATENCY,
            near: DeviceConfig::near(),
            far: DeviceConfig::far(),
        }
    }
}

/// Timing parameters of one device model.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Timing model
    #[serde(default)]
    pub model: DeviceModel,

    /// Fixed access latency (Simple model)
    #[serde(default)]
    pub latency: u64,

    /// Extra cycles per additional line of a burst
    #[serde(default)]
    pub line_latency: u64,

    /// CAS latency (Dram model)
    #[serde(default = "DeviceConfig::default_t_cas")]
    pub t_cas: u64,

    /// RAS latency (Dram model)
    #[serde(default = "DeviceConfig::default_t_ras")]
    pub t_ras: u64,

    /// Precharge latency (Dram model)
    #[serde(default = "DeviceConfig::default_t_pre")]
    pub t_pre: u64,

    /// Row buffer size in bytes (Dram model)
    #[serde(default = "DeviceConfig::default_row_bytes")]
    pub row_bytes: u64,
}

impl DeviceConfig {
    /// Default near-tier device: fast fixed latency.
    pub fn near() -> Self {
        Self {
            latency: defaults::NEAR_LATENCY,
            line_latency: defaults::NEAR_LINE_LATENCY,
            ..Self::default()
        }
    }

    /// Default far-tier device: slow fixed latency.
    pub fn far() -> Self {
        Self {
            latency: defaults::FAR_LATENCY,
            line_latency: defaults::FAR_LINE_LATENCY,
            ..Self::default()
        }
    }

    fn default_t_cas() -> u64 {
        defaults::T_CAS
    }

    fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    fn default_t_pre() -> u64 {
        defaults::T_PRE
    }

    fn default_row_bytes() -> u64 {
        defaults::ROW_BYTES
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: DeviceModel::Simple,
            latency: 0,
            line_latency: 0,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
            row_bytes: defaults::ROW_BYTES,
        }
    }
}

/// LRU tiered table parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LruTableConfig {
    /// Bytes of near-tier page cache tracked by the table
    #[serde(default = "LruTableConfig::default_cache_size")]
    pub cache_size: u64,

    /// Slots per set
    #[serde(default = "LruTableConfig::default_ways")]
    pub ways: usize,

    /// Width of the miss-rate window in cycles
    #[serde(default = "LruTableConfig::default_miss_window")]
    pub miss_window: u64,

    /// Hotness decay period in cycles
    #[serde(default = "LruTableConfig::default_decay_period")]
    pub decay_period: u64,
}

impl LruTableConfig {
    fn default_cache_size() -> u64 {
        defaults::LRU_CACHE_SIZE
    }

    fn default_ways() -> usize {
        defaults::LRU_WAYS
    }

    fn default_miss_window() -> u64 {
        defaults::LRU_MISS_WINDOW
    }

    fn default_decay_period() -> u64 {
        defaults::DECAY_PERIOD
    }
}

impl Default for LruTableConfig {
    fn default() -> Self {
        Self {
            cache_size: defaults::LRU_CACHE_SIZE,
            ways: defaults::LRU_WAYS,
            miss_window: defaults::LRU_MISS_WINDOW,
            decay_period: defaults::DECAY_PERIOD,
        }
    }
}

/// Hot/cold page table parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotColdConfig {
    /// Near slots per set; far slots per set follow from the tier ratio
    #[serde(default = "HotColdConfig::default_near_slots")]
    pub near_slots: usize,

    /// Hotness decay period and idle threshold in cycles
    #[serde(default = "HotColdConfig::default_decay_period")]
    pub decay_period: u64,

    /// Touches tolerated before the coldest near page is examined
    #[serde(default = "HotColdConfig::default_touch_ceiling")]
    pub touch_ceiling: u64,

    /// Hotness lead a far page needs over the coldest near page to swap
    #[serde(default = "HotColdConfig::default_swap_margin")]
    pub swap_margin: u64,
}

impl HotColdConfig {
    fn default_near_slots() -> usize {
        defaults::HOT_COLD_NEAR_SLOTS
    }

    fn default_decay_period() -> u64 {
        defaults::DECAY_PERIOD
    }

    fn default_touch_ceiling() -> u64 {
        defaults::HOT_COLD_TOUCH_CEILING
    }

    fn default_swap_margin() -> u64 {
        defaults::HOT_COLD_SWAP_MARGIN
    }
}

impl Default for HotColdConfig {
    fn default() -> Self {
        Self {
            near_slots: defaults::HOT_COLD_NEAR_SLOTS,
            decay_period: defaults::DECAY_PERIOD,
            touch_ceiling: defaults::HOT_COLD_TOUCH_CEILING,
            swap_margin: defaults::HOT_COLD_SWAP_MARGIN,
        }
    }
}

/// Ratio-controlled table parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RatioConfig {
    /// Desired fraction of accesses served by the near tier
    #[serde(default = "RatioConfig::default_target")]
    pub target: f64,

    /// Half-width of the no-swap band around the target
    #[serde(default = "RatioConfig::default_band")]
    pub band: f64,

    /// Near-resident pages hotter than this are kept
    #[serde(default = "RatioConfig::default_hot_threshold")]
    pub hot_threshold: u64,

    /// Cycles between access-counter rescales
    #[serde(default = "RatioConfig::default_stable_window")]
    pub stable_window: u64,

    /// Divisor applied to the counters on overshoot
    #[serde(default = "RatioConfig::default_rescale_divisor")]
    pub rescale_divisor: u64,
}

impl RatioConfig {
    fn default_target() -> f64 {
        defaults::RATIO_TARGET
    }

    fn default_band() -> f64 {
        defaults::RATIO_BAND
    }

    fn default_hot_threshold() -> u64 {
        defaults::RATIO_HOT_THRESHOLD
    }

    fn default_stable_window() -> u64 {
        defaults::RATIO_STABLE_WINDOW
    }

    fn default_rescale_divisor() -> u64 {
        defaults::RATIO_RESCALE_DIVISOR
    }
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            target: defaults::RATIO_TARGET,
            band: defaults::RATIO_BAND,
            hot_threshold: defaults::RATIO_HOT_THRESHOLD,
            stable_window: defaults::RATIO_STABLE_WINDOW,
            rescale_divisor: defaults::RATIO_RESCALE_DIVISOR,
        }
    }
}
