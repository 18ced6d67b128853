//! Memory device timing models.
//!
//! This module provides:
//! 1. **MemoryDevice:** The narrow contract the placement core relies on: `access` returns a completion cycle.
//! 2. **SimpleDevice:** Fixed latency per access plus a per-line burst cost.
//! 3. **DramDevice:** Row-buffer-aware latency (CAS, RAS, precharge) for DRAM-style timing.
//!
//! Devices never fail and never move data; the returned cycle is their only observable effect.

use crate::config::{DeviceConfig, DeviceModel};
use crate::mc::request::Routing;

/// Position a device access should take relative to queued traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum QueueHint {
    /// Critical-path access, scheduled at once.
    Immediate = 0,
    /// Metadata or tag access that precedes the data access.
    BeforeData = 1,
    /// Migration, fill or write-back traffic off the critical path.
    Background = 2,
}

/// Direction of a device access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Data flows out of the device.
    Read,
    /// Data flows into the device.
    Write,
}

/// One access presented to a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Device-local byte address.
    pub addr: u64,
    /// Read or write.
    pub kind: AccessKind,
    /// Issue cycle.
    pub cycle: u64,
    /// Routing fields copied from the originating request.
    pub routing: Routing,
}

/// Access counters reported by a device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Read accesses.
    pub reads: u64,
    /// Write accesses.
    pub writes: u64,
    /// Lines transferred across all accesses.
    pub lines: u64,
}

impl DeviceStats {
    fn record(&mut self, req: &DeviceRequest, burst_lines: u32) {
        match req.kind {
            AccessKind::Read => self.reads += 1,
            AccessKind::Write => self.writes += 1,
        }
        self.lines += u64::from(burst_lines);
    }
}

/// Trait for memory device models that report access completion in cycles.
///
/// Implementors must be `Send` so a controller can be shared across requester threads.
pub trait MemoryDevice: Send {
    /// Returns the device name used in reports.
    fn name(&self) -> &str;

    /// Performs one (possibly multi-line) access.
    ///
    /// # Arguments
    ///
    /// * `req` - The access descriptor.
    /// * `hint` - Queue position hint.
    /// * `burst_lines` - Number of consecutive lines transferred.
    ///
    /// # Returns
    ///
    /// The cycle at which the access completes.
    fn access(&mut self, req: &DeviceRequest, hint: QueueHint, burst_lines: u32) -> u64;

    /// Returns a snapshot of the access counters.
    fn stats(&self) -> DeviceStats;
}

/// Builds a device model from configuration.
///
/// # Arguments
///
/// * `name` - Device name used in reports.
/// * `config` - Timing parameters.
///
/// # Returns
///
/// A boxed device of the configured model.
pub fn build_device(name: impl Into<String>, config: &DeviceConfig) -> Box<dyn MemoryDevice> {
    let name = name.into();
    match config.model {
        DeviceModel::Simple => {
            Box::new(SimpleDevice::new(name, config.latency, config.line_latency))
        }
        DeviceModel::Dram => Box::new(DramDevice::new(
            name,
            config.t_cas,
            config.t_ras,
            config.t_pre,
            config.row_bytes,
            config.line_latency,
        )),
    }
}

/// Fixed-latency device; every access takes the same number of cycles plus burst cost.
#[derive(Debug)]
pub struct SimpleDevice {
    name: String,
    latency: u64,
    line_latency: u64,
    stats: DeviceStats,
}

impl SimpleDevice {
    /// Creates a fixed-latency device.
    ///
    /// # Arguments
    ///
    /// * `name` - Device name.
    /// * `latency` - Cycles for a single-line access.
    /// * `line_latency` - Extra cycles per additional line in a burst.
    ///
    /// # Returns
    ///
    /// A new `SimpleDevice`.
    pub fn new(name: impl Into<String>, latency: u64, line_latency: u64) -> Self {
        Self {
            name: name.into(),
            latency,
            line_latency,
            stats: DeviceStats::default(),
        }
    }
}

impl MemoryDevice for SimpleDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&mut self, req: &DeviceRequest, _hint: QueueHint, burst_lines: u32) -> u64 {
        self.stats.record(req, burst_lines);
        let extra = u64::from(burst_lines.saturating_sub(1)) * self.line_latency;
        req.cycle + self.latency + extra
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}

/// DRAM-style device with one open row; models CAS, RAS, and precharge latencies.
#[derive(Debug)]
pub struct DramDevice {
    name: String,
    last_row: Option<u64>,
    t_cas: u64,
    t_ras: u64,
    t_pre: u64,
    row_bytes: u64,
    line_latency: u64,
    stats: DeviceStats,
}

impl DramDevice {
    /// Creates a row-buffer device with the given timing parameters (in cycles).
    ///
    /// # Arguments
    ///
    /// * `name` - Device name.
    /// * `t_cas` - Column access strobe latency.
    /// * `t_ras` - Row access strobe latency.
    /// * `t_pre` - Precharge latency.
    /// * `row_bytes` - Row buffer size in bytes.
    /// * `line_latency` - Extra cycles per additional line in a burst.
    ///
    /// # Returns
    ///
    /// A new `DramDevice` with no row currently open.
    pub fn new(
        name: impl Into<String>,
        t_cas: u64,
        t_ras: u64,
        t_pre: u64,
        row_bytes: u64,
        line_latency: u64,
    ) -> Self {
        Self {
            name: name.into(),
            last_row: None,
            t_cas,
            t_ras,
            t_pre,
            row_bytes: row_bytes.max(1),
            line_latency,
            stats: DeviceStats::default(),
        }
    }

    fn row_latency(&mut self, addr: u64) -> u64 {
        let row = addr / self.row_bytes;
        match self.last_row {
            Some(open_row) if open_row == row => self.t_cas,
            Some(_) => {
                self.last_row = Some(row);
                self.t_pre + self.t_ras + self.t_cas
            }
            None => {
                self.last_row = Some(row);
                self.t_ras + self.t_cas
            }
        }
    }
}

impl MemoryDevice for DramDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&mut self, req: &DeviceRequest, _hint: QueueHint, burst_lines: u32) -> u64 {
        self.stats.record(req, burst_lines);
        let extra = u64::from(burst_lines.saturating_sub(1)) * self.line_latency;
        req.cycle + self.row_latency(req.addr) + extra
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}
