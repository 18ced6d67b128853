//! Tiered memory controller.
//!
//! The controller is the single entry point for memory requests. It provides:
//! 1. **Coherence:** Resolves the state granted to the requester.
//! 2. **Serialization:** Holds one lock for the whole handling of a request.
//! 3. **Dispatch:** Translates the address and runs the configured placement engine.
//! 4. **Accounting:** Statistics and the optional diagnostic trace.

/// Request descriptors and coherence states.
pub mod request;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::{error, info};

use crate::common::addr::AddressTranslator;
use crate::common::error::{ConfigError, McError};
use crate::config::{Config, Scheme};
use crate::placement::{self, PlacementEngine};
use crate::soc::memory::device::{DeviceStats, MemoryDevice, build_device};
use crate::soc::memory::ports::TierPorts;
use crate::stats::McStats;
use crate::trace::{TraceRecord, TraceRecorder};

use self::request::{MemReq, ReqType, TierRequest, coherence_state};

struct ControllerState {
    engine: Box<dyn PlacementEngine>,
    ports: TierPorts,
    stats: McStats,
    trace: Option<TraceRecorder>,
}

/// Memory controller front end over a near and a far tier.
///
/// `MemoryController` is `Send + Sync`; concurrent callers are serialized.
pub struct MemoryController {
    scheme: Scheme,
    translator: AddressTranslator,
    clean_writebacks: AtomicU64,
    state: Mutex<ControllerState>,
}

impl std::fmt::Debug for MemoryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryController")
            .field("scheme", &self.scheme)
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

impl MemoryController {
    /// Builds a controller with the devices described by the configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Controller configuration; validated here.
    ///
    /// # Returns
    ///
    /// The controller, or the configuration error that prevents building it.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let near = (0..config.tiers.near_channels)
            .map(|ch| build_device(format!("{}-near{ch}", config.general.name), &config.tiers.near))
            .collect();
        let far = build_device(format!("{}-far", config.general.name), &config.tiers.far);
        Self::with_devices(config, near, far)
    }

    /// Builds a controller over caller-supplied devices.
    ///
    /// # Arguments
    ///
    /// * `config` - Controller configuration; `tiers.near_channels` is ignored.
    /// * `near` - One device per near-tier channel.
    /// * `far` - The far-tier device.
    ///
    /// # Returns
    ///
    /// The controller, or the configuration error that prevents building it.
    pub fn with_devices(
        config: &Config,
        near: Vec<Box<dyn MemoryDevice>>,
        far: Box<dyn MemoryDevice>,
    ) -> Result<Self, ConfigError> {
        if near.is_empty() {
            return Err(ConfigError::Zero {
                field: "tiers.near_channels",
            });
        }
        let engine = placement::build(config)?;
        let trace = config
            .general
            .trace_enabled
            .then(|| TraceRecorder::create(&config.general));
        info!(
            scheme = engine.name(),
            total = config.tiers.total_size,
            near = config.tiers.near_size,
            page = config.tiers.page_size,
            block = config.tiers.block_size,
            channels = near.len(),
            "memory controller initialized"
        );
        Ok(Self {
            scheme: config.scheme,
            translator: AddressTranslator::new(config.tiers.total_size),
            clean_writebacks: AtomicU64::new(0),
            state: Mutex::new(ControllerState {
                engine,
                ports: TierPorts::new(near, far),
                stats: McStats::default(),
                trace,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns the configured scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Handles one request.
    ///
    /// Sets `req.state` to the coherence state granted to the requester. Clean
    /// write-backs return at once without touching any metadata.
    ///
    /// # Arguments
    ///
    /// * `req` - The request; only `state` is modified.
    ///
    /// # Returns
    ///
    /// The cycle at which the data is available, or the invariant violation that
    /// invalidates the run.
    pub fn try_access(&self, req: &mut MemReq) -> Result<u64, McError> {
        req.state = coherence_state(req.req_type, req.routing.flags);
        if req.req_type == ReqType::Puts {
            let _ = self.clean_writebacks.fetch_add(1, Ordering::Relaxed);
            return Ok(req.cycle);
        }

        let mut guard = self.lock();
        let state = &mut *guard;
        let write = req.req_type.is_write();
        if let Some(trace) = state.trace.as_mut() {
            trace.record(TraceRecord {
                cycle: req.cycle,
                line: req.line_addr.val(),
                write,
            });
        }
        let tier_req = TierRequest {
            addr: self.translator.translate(req.line_addr),
            write,
            cycle: req.cycle,
            routing: req.routing,
        };
        let outcome = state
            .engine
            .classify_and_migrate(&tier_req, &mut state.ports)?;
        state.stats.apply(req.req_type, &outcome);
        Ok(outcome.ready)
    }

    /// Handles one request, aborting on an internal invariant violation.
    ///
    /// # Panics
    ///
    /// Panics if the placement metadata is found corrupt.
    pub fn access(&self, req: &mut MemReq) -> u64 {
        match self.try_access(req) {
            Ok(cycle) => cycle,
            Err(e) => {
                error!(
                    error = %e,
                    line = req.line_addr.val(),
                    cycle = req.cycle,
                    "fatal placement error"
                );
                panic!("memory controller: {e}");
            }
        }
    }

    /// Returns a snapshot of the controller statistics.
    pub fn stats(&self) -> McStats {
        let mut stats = self.lock().stats.clone();
        stats.clean_writebacks = self.clean_writebacks.load(Ordering::Relaxed);
        stats
    }

    /// Returns the access counters of every device, near channels first.
    pub fn device_stats(&self) -> Vec<(String, DeviceStats)> {
        self.lock().ports.stats()
    }

    /// Writes any buffered trace records.
    pub fn flush_trace(&self) {
        if let Some(trace) = self.lock().trace.as_mut() {
            trace.flush();
        }
    }

    /// Verifies the placement metadata invariants.
    pub fn check_invariants(&self) -> Result<(), McError> {
        self.lock().engine.check_invariants()
    }

    /// Prints statistics and device counters.
    pub fn print_stats(&self) {
        let stats = self.stats();
        let devices = self.device_stats();
        stats.print(self.scheme.as_str(), &devices);
    }
}
