//! Tiered memory controller core.
//!
//! This crate decides, per memory request, which tier serves the data and which pages move:
//! 1. **Controller:** Coherence state resolution, serialization and dispatch (`mc`).
//! 2. **Placement:** LRU table, hot/cold table and ratio-controlled table engines (`placement`).
//! 3. **Devices:** Near-tier channels and the far-tier device behind a narrow timing contract (`soc`).
//! 4. **Support:** Configuration, statistics and diagnostic tracing.

/// Common types and constants (addresses, errors).
pub mod common;
/// Controller configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Memory controller front end and request descriptors.
pub mod mc;
/// Page placement and migration engines.
pub mod placement;
/// Memory devices and the port array that routes to them.
pub mod soc;
/// Controller statistics collection and reporting.
pub mod stats;
/// Diagnostic request trace.
pub mod trace;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Controller type; construct with `MemoryController::new`.
pub use crate::mc::MemoryController;
/// Request descriptor and kinds.
pub use crate::mc::request::{MemReq, ReqType};
