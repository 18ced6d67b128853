//! Near-tier channel array and far-tier device.
//!
//! `TierPorts` is the only path from a placement engine to the devices. It provides:
//! 1. **Channel Selection:** Line-interleaved routing of near-tier addresses across channels.
//! 2. **Access Helpers:** Near and far accesses stamped with the request's cycle and routing.
//! 3. **Reporting:** Per-device access counters.

use crate::common::constants::LINE_SIZE;
use crate::mc::request::TierRequest;

use super::device::{AccessKind, DeviceRequest, DeviceStats, MemoryDevice, QueueHint};

/// Devices owned by one controller instance.
pub struct TierPorts {
    near: Vec<Box<dyn MemoryDevice>>,
    far: Box<dyn MemoryDevice>,
}

impl std::fmt::Debug for TierPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierPorts")
            .field("near_channels", &self.near.len())
            .field("far", &self.far.name())
            .finish()
    }
}

impl TierPorts {
    /// Creates the port array.
    ///
    /// # Arguments
    ///
    /// * `near` - One device per near-tier channel; must not be empty.
    /// * `far` - The far-tier device.
    ///
    /// # Returns
    ///
    /// A new `TierPorts`.
    pub fn new(near: Vec<Box<dyn MemoryDevice>>, far: Box<dyn MemoryDevice>) -> Self {
        Self { near, far }
    }

    /// Returns the number of near-tier channels.
    pub fn near_channels(&self) -> usize {
        self.near.len()
    }

    /// Maps a near-tier byte address to its channel and channel-local address.
    ///
    /// # Arguments
    ///
    /// * `addr` - Near-tier byte address.
    ///
    /// # Returns
    ///
    /// `(channel, local_addr)` with lines interleaved round-robin across channels.
    pub fn near_channel(&self, addr: u64) -> (usize, u64) {
        let channels = self.near.len().max(1) as u64;
        let line = addr / LINE_SIZE;
        let channel = (line % channels) as usize;
        let local = (line / channels * LINE_SIZE) | (addr % LINE_SIZE);
        (channel, local)
    }

    /// Issues an access to the near tier.
    ///
    /// # Arguments
    ///
    /// * `req` - The request on whose behalf the access is made.
    /// * `addr` - Near-tier byte address.
    /// * `kind` - Read or write.
    /// * `hint` - Queue position hint.
    /// * `lines` - Burst length in lines.
    ///
    /// # Returns
    ///
    /// The completion cycle reported by the selected channel.
    pub fn near(
        &mut self,
        req: &TierRequest,
        addr: u64,
        kind: AccessKind,
        hint: QueueHint,
        lines: u32,
    ) -> u64 {
        let (channel, local) = self.near_channel(addr);
        let dev_req = DeviceRequest {
            addr: local,
            kind,
            cycle: req.cycle,
            routing: req.routing,
        };
        match self.near.get_mut(channel) {
            Some(dev) => dev.access(&dev_req, hint, lines),
            None => req.cycle,
        }
    }

    /// Issues an access to the far tier.
    ///
    /// # Arguments
    ///
    /// * `req` - The request on whose behalf the access is made.
    /// * `addr` - Physical byte address (unchanged).
    /// * `kind` - Read or write.
    /// * `hint` - Queue position hint.
    /// * `lines` - Burst length in lines.
    ///
    /// # Returns
    ///
    /// The completion cycle reported by the far device.
    pub fn far(
        &mut self,
        req: &TierRequest,
        addr: u64,
        kind: AccessKind,
        hint: QueueHint,
        lines: u32,
    ) -> u64 {
        let dev_req = DeviceRequest {
            addr,
            kind,
            cycle: req.cycle,
            routing: req.routing,
        };
        self.far.access(&dev_req, hint, lines)
    }

    /// Returns the access counters of every device, near channels first.
    pub fn stats(&self) -> Vec<(String, DeviceStats)> {
        self.near
            .iter()
            .chain(std::iter::once(&self.far))
            .map(|d| (d.name().to_string(), d.stats()))
            .collect()
    }
}
