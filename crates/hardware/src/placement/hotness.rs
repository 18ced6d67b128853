//! Hotness tracking primitives.
//!
//! This module provides:
//! 1. **DecayClock:** Converts elapsed cycles into whole decay windows.
//! 2. **HotnessQueue:** Insertion-ordered page list with per-page touch counters.
//!
//! Counters are unsigned and decay saturates at zero, so a page that sits idle
//! for `N` windows after `N` touches ends at exactly zero and stays there.

use std::collections::VecDeque;

/// Tracks when hotness counters were last decayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecayClock {
    last: u64,
    period: u64,
}

impl DecayClock {
    /// Creates a clock with the given decay period in cycles.
    ///
    /// A zero period disables decay.
    pub fn new(period: u64) -> Self {
        Self { last: 0, period }
    }

    /// Returns the number of whole windows elapsed since the last decay and
    /// advances the clock to `now` if any elapsed.
    ///
    /// # Arguments
    ///
    /// * `now` - Current cycle.
    ///
    /// # Returns
    ///
    /// `⌊(now - last) / period⌋`, or 0 if the period is zero or time went backwards.
    pub fn windows(&mut self, now: u64) -> u64 {
        if self.period == 0 {
            return 0;
        }
        let windows = now.saturating_sub(self.last) / self.period;
        if windows > 0 {
            self.last = now;
        }
        windows
    }
}

/// Applies `windows` decay steps to a counter, clamping at zero.
#[inline]
pub fn decayed(counter: u64, windows: u64) -> u64 {
    counter.saturating_sub(windows)
}

/// One tracked page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueEntry {
    /// Page identifier (set member index for per-set queues).
    pub page: u64,
    /// Touch counter.
    pub counter: u64,
    /// Cycle of the most recent touch.
    pub last_touch: u64,
}

/// Pages ordered by insertion; the front holds the newest entry, the tail the oldest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HotnessQueue {
    entries: VecDeque<QueueEntry>,
}

impl HotnessQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a touch of `page`.
    ///
    /// The whole queue is scanned first; a new entry with counter 1 is pushed to
    /// the front only if no entry for `page` exists.
    ///
    /// # Arguments
    ///
    /// * `page` - Touched page.
    /// * `now` - Current cycle.
    ///
    /// # Returns
    ///
    /// `true` if a new entry was inserted.
    pub fn touch(&mut self, page: u64, now: u64) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.page == page) {
            entry.counter += 1;
            entry.last_touch = now;
            return false;
        }
        self.entries.push_front(QueueEntry {
            page,
            counter: 1,
            last_touch: now,
        });
        true
    }

    /// Inserts an existing entry at the front, e.g. after moving it between queues.
    pub fn insert(&mut self, entry: QueueEntry) {
        self.entries.push_front(entry);
    }

    /// Removes the entry for `page`.
    pub fn remove(&mut self, page: u64) -> Option<QueueEntry> {
        let pos = self.entries.iter().position(|e| e.page == page)?;
        self.entries.remove(pos)
    }

    /// Subtracts `windows` from every counter, clamping at zero.
    pub fn decay(&mut self, windows: u64) {
        if windows == 0 {
            return;
        }
        for entry in &mut self.entries {
            entry.counter = decayed(entry.counter, windows);
        }
    }

    /// Returns the oldest entry.
    pub fn tail(&self) -> Option<&QueueEntry> {
        self.entries.back()
    }

    /// Returns the entry with the smallest counter, first found from the front on ties.
    pub fn coldest(&self) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .reduce(|best, e| if e.counter < best.counter { e } else { best })
    }

    /// Returns the entry with the largest counter, first found from the front on ties.
    pub fn hottest(&self) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .reduce(|best, e| if e.counter > best.counter { e } else { best })
    }

    /// Returns the entry for `page`.
    pub fn get(&self, page: u64) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.page == page)
    }

    /// Returns `true` if `page` is tracked.
    pub fn contains(&self, page: u64) -> bool {
        self.get(page).is_some()
    }

    /// Returns the number of tracked pages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no page is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates from front (newest) to tail (oldest).
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> + '_ {
        self.entries.iter()
    }
}
