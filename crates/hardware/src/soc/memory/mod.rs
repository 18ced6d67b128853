//! Tier memory devices.
//!
//! This module provides:
//! 1. **Device:** The `MemoryDevice` access contract plus fixed-latency and row-buffer timing models.
//! 2. **Ports:** Near-tier channel selection and the far-tier device, owned by the controller.

/// Device access contract and timing models.
pub mod device;

/// Near-channel array and far device owned by one controller.
pub mod ports;

pub use device::{AccessKind, DeviceRequest, DeviceStats, MemoryDevice, QueueHint};
pub use ports::TierPorts;
