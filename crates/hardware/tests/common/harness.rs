//! Test rig: small geometries and recording devices wired into `TierPorts`.

use tiersim_core::config::{Config, Scheme, TierConfig};
use tiersim_core::mc::request::TierRequest;
use tiersim_core::soc::memory::device::MemoryDevice;
use tiersim_core::soc::memory::ports::TierPorts;

use super::mocks::device::{CallLog, RecordingDevice};

pub const NEAR_LATENCY: u64 = 10;
pub const FAR_LATENCY: u64 = 100;

/// Ports over one recording near channel and a recording far device.
pub struct Rig {
    pub ports: TierPorts,
    pub near: CallLog,
    pub far: CallLog,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_channels(1)
    }

    /// All near channels share one log.
    pub fn with_channels(channels: usize) -> Self {
        let near_log = CallLog::default();
        let near: Vec<Box<dyn MemoryDevice>> = (0..channels)
            .map(|ch| {
                Box::new(RecordingDevice::with_log(
                    &format!("near{ch}"),
                    NEAR_LATENCY,
                    near_log.clone(),
                )) as Box<dyn MemoryDevice>
            })
            .collect();
        let (far_dev, far) = RecordingDevice::new("far", FAR_LATENCY);
        Self {
            ports: TierPorts::new(near, Box::new(far_dev)),
            near: near_log,
            far,
        }
    }

    pub fn clear(&self) {
        self.near.clear();
        self.far.clear();
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

pub fn read(addr: u64, cycle: u64) -> TierRequest {
    TierRequest::new(addr, false, cycle)
}

pub fn write(addr: u64, cycle: u64) -> TierRequest {
    TierRequest::new(addr, true, cycle)
}

/// Tier geometry with zero metadata latency.
pub fn tiers(near: u64, total: u64, page: u64, block: u64) -> TierConfig {
    TierConfig {
        total_size: total,
        near_size: near,
        near_channels: 1,
        page_size: page,
        block_size: block,
        metadata_read_latency: 0,
        metadata_write_latency: 0,
        ..TierConfig::default()
    }
}

/// Configuration for `scheme` over the given geometry.
pub fn config(scheme: Scheme, tiers: TierConfig) -> Config {
    Config {
        scheme,
        tiers,
        ..Config::default()
    }
}
