//! Configuration and request-handling error definitions.
//!
//! This module defines the error taxonomy of the controller. It provides:
//! 1. **Configuration Errors:** Geometry or parameter combinations rejected at construction.
//! 2. **Internal Errors:** Metadata invariant violations detected while serving a request.
//!
//! Neither class is recoverable. Configuration errors abort construction and
//! internal errors abort the simulation run from [`crate::mc::MemoryController::access`].

use thiserror::Error;

/// Configuration rejected while building a controller.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A size parameter that must be non-zero is zero.
    #[error("{field} must be non-zero")]
    Zero {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A size is not an exact multiple of the granularity it is divided into.
    #[error("{field} ({value}) is not a multiple of {unit} ({unit_value})")]
    NotMultiple {
        /// Name of the divided field.
        field: &'static str,
        /// Value of the divided field.
        value: u64,
        /// Name of the divisor field.
        unit: &'static str,
        /// Value of the divisor field.
        unit_value: u64,
    },

    /// The near tier must be strictly smaller than the whole physical space.
    #[error("near tier ({near} bytes) must be smaller than total memory ({total} bytes)")]
    NearTooLarge {
        /// Near-tier size in bytes.
        near: u64,
        /// Total physical size in bytes.
        total: u64,
    },

    /// Page bitmaps are limited in width.
    #[error("{blocks} blocks per page exceeds the supported maximum of {max}")]
    TooManyBlocks {
        /// Configured blocks per page.
        blocks: u64,
        /// Supported maximum.
        max: u64,
    },

    /// A ratio parameter lies outside its valid range.
    #[error("{field} ({value}) must lie in {range}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Human-readable valid range.
        range: &'static str,
    },
}

/// Internal invariant violation detected while handling a request.
///
/// Any of these means the placement metadata is corrupt; the run cannot continue.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum McError {
    /// Eviction ran but no slot of the set could be reassigned.
    #[error("no victim slot found in set {set} for page {page:#x}")]
    VictimNotFound {
        /// Set index.
        set: usize,
        /// Page that needed a slot.
        page: u64,
    },

    /// A free slot was required but the set has none.
    #[error("set {set} has no free {tier} slot")]
    NoFreeSlot {
        /// Set index.
        set: usize,
        /// Tier whose slots were exhausted.
        tier: &'static str,
    },

    /// A page expected to be resident was not found in its set.
    #[error("page {page:#x} expected resident in set {set}")]
    SlotNotFound {
        /// Set index.
        set: usize,
        /// Missing page.
        page: u64,
    },

    /// A hotness queue disagrees with the slot table.
    #[error("hotness queue of set {set} is inconsistent: {detail}")]
    QueueInconsistent {
        /// Set index.
        set: usize,
        /// Description of the mismatch.
        detail: String,
    },

    /// A block is dirty but not valid.
    #[error("block {block} of page {page:#x} is dirty but not valid")]
    DirtyWithoutValid {
        /// Page identifier.
        page: u64,
        /// Block offset.
        block: usize,
    },

    /// A page is resident in more than one slot.
    #[error("page {page:#x} resident in {count} slots")]
    DuplicateResidency {
        /// Page identifier.
        page: u64,
        /// Number of slots holding it.
        count: usize,
    },

    /// A remap record points at a frame whose reverse entry disagrees.
    #[error("remap record for page {page:#x} is inconsistent")]
    RemapInconsistent {
        /// Page identifier.
        page: u64,
    },

    /// A raw request type code has no meaning.
    #[error("unknown request type code {0}")]
    UnknownRequestType(u8),
}
