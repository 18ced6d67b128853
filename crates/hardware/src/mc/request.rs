//! Request descriptors.
//!
//! This module defines what flows into and out of the controller. It provides:
//! 1. **Request Types:** The four coherence request kinds and their raw trace codes.
//! 2. **Coherence States:** The state granted to the requester for each request kind.
//! 3. **Descriptors:** The external request (`MemReq`) and the translated request seen by placement engines (`TierRequest`).

use std::fmt;

use crate::common::addr::{LineAddr, PhysAddr};
use crate::common::constants::NO_EXCL_FLAG;
use crate::common::error::McError;

/// Coherence request kinds arriving at the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReqType {
    /// Shared read.
    Gets = 0,
    /// Exclusive read (read for ownership).
    Getx = 1,
    /// Clean eviction from the requester; no data transfer.
    Puts = 2,
    /// Dirty write-back from the requester.
    Putx = 3,
}

impl ReqType {
    /// Returns `true` if the request writes data into memory.
    #[inline]
    pub fn is_write(self) -> bool {
        self == Self::Putx
    }
}

impl TryFrom<u8> for ReqType {
    type Error = McError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Gets),
            1 => Ok(Self::Getx),
            2 => Ok(Self::Puts),
            3 => Ok(Self::Putx),
            other => Err(McError::UnknownRequestType(other)),
        }
    }
}

impl fmt::Display for ReqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gets => "GETS",
            Self::Getx => "GETX",
            Self::Puts => "PUTS",
            Self::Putx => "PUTX",
        };
        f.write_str(s)
    }
}

/// MESI coherence state granted to the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MesiState {
    /// Invalid.
    #[default]
    I,
    /// Shared.
    S,
    /// Exclusive clean.
    E,
    /// Modified.
    M,
}

/// Returns the state the requester holds after the request completes.
///
/// # Arguments
///
/// * `req_type` - The request kind.
/// * `flags` - Request flag word; `NO_EXCL_FLAG` forbids granting `E` on a shared read.
///
/// # Returns
///
/// `I` for write-backs and clean evictions, `S` or `E` for shared reads, `M` for exclusive reads.
pub fn coherence_state(req_type: ReqType, flags: u32) -> MesiState {
    match req_type {
        ReqType::Puts | ReqType::Putx => MesiState::I,
        ReqType::Gets if flags & NO_EXCL_FLAG != 0 => MesiState::S,
        ReqType::Gets => MesiState::E,
        ReqType::Getx => MesiState::M,
    }
}

/// Opaque routing fields copied unchanged from the request into every device access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Routing {
    /// Requesting child (cache bank) identifier.
    pub child_id: u32,
    /// Originating core identifier.
    pub src_id: u32,
    /// Request flag word.
    pub flags: u32,
}

/// A memory request as issued by the surrounding simulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemReq {
    /// Requested line.
    pub line_addr: LineAddr,
    /// Request kind.
    pub req_type: ReqType,
    /// Coherence state output, written by the controller.
    pub state: MesiState,
    /// Cycle at which the request arrives.
    pub cycle: u64,
    /// Routing fields passed through to devices.
    pub routing: Routing,
}

impl MemReq {
    /// Creates a request with default routing and an invalid output state.
    ///
    /// # Arguments
    ///
    /// * `line_addr` - Requested line number.
    /// * `req_type` - Request kind.
    /// * `cycle` - Arrival cycle.
    ///
    /// # Returns
    ///
    /// A new `MemReq`.
    pub fn new(line_addr: u64, req_type: ReqType, cycle: u64) -> Self {
        Self {
            line_addr: LineAddr(line_addr),
            req_type,
            state: MesiState::I,
            cycle,
            routing: Routing::default(),
        }
    }

    /// Returns the request with the given flag word.
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.routing.flags = flags;
        self
    }
}

/// A translated request handed to a placement engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierRequest {
    /// Physical byte address after translation.
    pub addr: PhysAddr,
    /// `true` for write-backs.
    pub write: bool,
    /// Arrival cycle.
    pub cycle: u64,
    /// Routing fields passed through to devices.
    pub routing: Routing,
}

impl TierRequest {
    /// Creates a translated request with default routing.
    ///
    /// # Arguments
    ///
    /// * `addr` - Physical byte address.
    /// * `write` - Whether the request writes data.
    /// * `cycle` - Arrival cycle.
    ///
    /// # Returns
    ///
    /// A new `TierRequest`.
    pub fn new(addr: u64, write: bool, cycle: u64) -> Self {
        Self {
            addr: PhysAddr(addr),
            write,
            cycle,
            routing: Routing::default(),
        }
    }
}
