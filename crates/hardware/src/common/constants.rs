//! Global controller constants.
//!
//! This module defines constants used across the controller. It includes:
//! 1. **Line Geometry:** The requester-visible line size.
//! 2. **Request Flags:** Bits carried in the opaque request flag word.
//! 3. **Trace Constants:** Diagnostic trace layout.

/// Cache-line size in bytes seen by requesters and near-tier channel selection.
pub const LINE_SIZE: u64 = 64;

/// Request flag: a shared read must not be granted exclusive ownership.
pub const NO_EXCL_FLAG: u32 = 1 << 0;

/// Header line written at the top of every diagnostic trace file.
pub const TRACE_HEADER: &str = "cycle, address, type";

/// File name suffix of diagnostic trace files.
pub const TRACE_FILE_SUFFIX: &str = "trace.txt";
