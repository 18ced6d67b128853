//! Per-page block bitmaps.
//!
//! A `BlockMap` records one bit per tracked block of a page. Slots keep two of
//! them: valid (block present in the tier backing the slot) and dirty (block
//! modified since it was filled). Maps are `Copy` so tables of millions of slots
//! need no per-slot allocation.

/// Maximum number of blocks per page a `BlockMap` can track.
pub const MAX_BLOCKS: usize = 128;

const WORDS: usize = MAX_BLOCKS / 64;

/// Fixed-width bitmap indexed by block offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockMap {
    words: [u64; WORDS],
}

impl BlockMap {
    /// An empty map.
    pub const EMPTY: Self = Self { words: [0; WORDS] };

    /// Returns a map with the first `blocks` bits set.
    ///
    /// # Arguments
    ///
    /// * `blocks` - Number of leading blocks to mark, clamped to `MAX_BLOCKS`.
    pub fn full(blocks: usize) -> Self {
        let mut map = Self::EMPTY;
        for block in 0..blocks.min(MAX_BLOCKS) {
            map.set(block);
        }
        map
    }

    /// Sets the bit for `block`.
    #[inline]
    pub fn set(&mut self, block: usize) {
        if block < MAX_BLOCKS {
            self.words[block / 64] |= 1 << (block % 64);
        }
    }

    /// Returns whether the bit for `block` is set.
    #[inline]
    pub fn get(&self, block: usize) -> bool {
        block < MAX_BLOCKS && self.words[block / 64] & (1 << (block % 64)) != 0
    }

    /// Returns the number of set bits.
    #[inline]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Clears every bit.
    #[inline]
    pub fn reset(&mut self) {
        self.words = [0; WORDS];
    }

    /// Returns the first bit set here but not in `other`.
    pub fn first_not_in(&self, other: &Self) -> Option<usize> {
        self.iter_ones().find(|&b| !other.get(b))
    }

    /// Iterates over the offsets of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_BLOCKS).filter(move |&b| self.get(b))
    }
}
