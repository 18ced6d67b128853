//! Page relocation records.
//!
//! Every page has a home frame equal to its page identifier: frames below the
//! near-tier frame count are near, the rest far. A `RemapTable` records the pages
//! that currently live somewhere else. Moves are always swaps, so the mapping stays
//! a permutation: every frame holds exactly one page and every page exactly one frame.

use std::collections::HashMap;

use crate::common::error::McError;

/// Bidirectional page ↔ frame map holding only relocated pages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemapTable {
    /// Relocated page → frame currently backing it.
    location: HashMap<u64, u64>,
    /// Frame → page it currently backs, for frames not holding their home page.
    occupant: HashMap<u64, u64>,
}

impl RemapTable {
    /// Creates a table in which every page is at home.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the frame currently backing `page`.
    #[inline]
    pub fn location(&self, page: u64) -> u64 {
        self.location.get(&page).copied().unwrap_or(page)
    }

    /// Returns the page currently held by `frame`.
    #[inline]
    pub fn occupant(&self, frame: u64) -> u64 {
        self.occupant.get(&frame).copied().unwrap_or(frame)
    }

    /// Returns `true` if `page` is not in its home frame.
    #[inline]
    pub fn is_relocated(&self, page: u64) -> bool {
        self.location.contains_key(&page)
    }

    /// Returns the number of relocated pages.
    pub fn len(&self) -> usize {
        self.location.len()
    }

    /// Returns `true` if every page is at home.
    pub fn is_empty(&self) -> bool {
        self.location.is_empty()
    }

    /// Exchanges the frames of two pages.
    ///
    /// # Arguments
    ///
    /// * `a` - First page.
    /// * `b` - Second page.
    ///
    /// # Returns
    ///
    /// The frames `(a, b)` now occupy.
    pub fn swap(&mut self, a: u64, b: u64) -> (u64, u64) {
        if a == b {
            let f = self.location(a);
            return (f, f);
        }
        let fa = self.location(a);
        let fb = self.location(b);
        self.place(a, fb);
        self.place(b, fa);
        (fb, fa)
    }

    /// Moves `page` back to its home frame, swapping with the current occupant.
    ///
    /// # Returns
    ///
    /// The displaced page and the frame it now occupies, or `None` if `page` was already home.
    pub fn restore(&mut self, page: u64) -> Option<(u64, u64)> {
        if !self.is_relocated(page) {
            return None;
        }
        let displaced = self.occupant(page);
        let (_, to) = self.swap(page, displaced);
        Some((displaced, to))
    }

    fn place(&mut self, page: u64, frame: u64) {
        if page == frame {
            let _ = self.location.remove(&page);
            let _ = self.occupant.remove(&frame);
        } else {
            let _ = self.location.insert(page, frame);
            let _ = self.occupant.insert(frame, page);
        }
    }

    /// Verifies that both directions of the map agree.
    pub fn check_consistency(&self) -> Result<(), McError> {
        if self.location.len() != self.occupant.len() {
            let page = self.location.keys().next().copied().unwrap_or_default();
            return Err(McError::RemapInconsistent { page });
        }
        for (&page, &frame) in &self.location {
            if self.occupant.get(&frame) != Some(&page) {
                return Err(McError::RemapInconsistent { page });
            }
        }
        Ok(())
    }
}
