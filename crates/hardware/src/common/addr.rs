//! Line and physical address types.
//!
//! Requesters address memory by cache line. The controller works on physical byte
//! addresses obtained through a fixed wraparound mapping. This module provides:
//! 1. **Type Safety:** Distinguishes line addresses from physical byte addresses at compile time.
//! 2. **Decomposition:** Page identifier and block offset extraction.
//! 3. **Translation:** The stateless wraparound line-to-physical mapping.

use super::constants::LINE_SIZE;

/// A line address as issued by a requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineAddr(pub u64);

/// A physical byte address inside the tiered memory space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl LineAddr {
    /// Returns the raw line number.
    #[inline(always)]
    pub fn val(&self) -> u64 {
        self.0
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw byte value.
    ///
    /// # Arguments
    ///
    /// * `addr` - The raw byte address.
    ///
    /// # Returns
    ///
    /// A new `PhysAddr` wrapping the value.
    #[inline(always)]
    pub fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw byte address.
    #[inline(always)]
    pub fn val(&self) -> u64 {
        self.0
    }

    /// Returns the page identifier for the given page size.
    ///
    /// # Arguments
    ///
    /// * `page_size` - Migration granularity in bytes.
    ///
    /// # Returns
    ///
    /// `addr / page_size`.
    #[inline(always)]
    pub fn page(&self, page_size: u64) -> u64 {
        self.0 / page_size
    }

    /// Returns the offset of the addressed block inside its page.
    ///
    /// # Arguments
    ///
    /// * `page_size` - Migration granularity in bytes.
    /// * `block_size` - Tracking granularity in bytes.
    ///
    /// # Returns
    ///
    /// `(addr % page_size) / block_size`.
    #[inline(always)]
    pub fn block(&self, page_size: u64, block_size: u64) -> usize {
        ((self.0 % page_size) / block_size) as usize
    }
}

/// Wraparound mapping from requester line addresses to physical byte addresses.
///
/// Models a flat physical space without page tables: every line address is folded
/// into the configured memory size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressTranslator {
    phys_size: u64,
}

impl AddressTranslator {
    /// Creates a translator for a physical space of `phys_size` bytes.
    ///
    /// # Arguments
    ///
    /// * `phys_size` - Total size of near plus far tiers in bytes. Must be non-zero.
    ///
    /// # Returns
    ///
    /// A new `AddressTranslator`.
    pub fn new(phys_size: u64) -> Self {
        Self { phys_size }
    }

    /// Translates a line address into a physical byte address.
    ///
    /// # Arguments
    ///
    /// * `line` - The requester line address.
    ///
    /// # Returns
    ///
    /// `(line * 64) mod phys_size`.
    #[inline]
    pub fn translate(&self, line: LineAddr) -> PhysAddr {
        let bytes = u128::from(line.0) * u128::from(LINE_SIZE);
        PhysAddr((bytes % u128::from(self.phys_size)) as u64)
    }
}
