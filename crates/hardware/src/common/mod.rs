//! Common types shared by every part of the controller core.
//!
//! This module provides:
//! 1. **Address Types:** Strong types for line and physical byte addresses plus the wraparound translator.
//! 2. **Constants:** Tier geometry constants that are not configurable.
//! 3. **Error Handling:** Configuration and internal-invariant error types.

/// Address type definitions and line-to-physical translation.
pub mod addr;

/// Common constants used throughout the controller.
pub mod constants;

/// Error types for configuration and request handling.
pub mod error;

pub use addr::{AddressTranslator, LineAddr, PhysAddr};
pub use constants::{LINE_SIZE, NO_EXCL_FLAG};
pub use error::{ConfigError, McError};
