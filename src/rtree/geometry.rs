//! The shape of a tree: how the significant bits of a key are split into levels.

use super::RTreeError;
use crate::util::constants::{BITS_IN_ADDRESS, MAX_BITS_PER_LEVEL, RTREE_HEIGHT_MAX};
use crate::util::Address;

/// One level of a tree.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Level {
    /// Number of key bits consumed by this level.
    bits: u8,
    /// Number of key bits consumed by this level and all the levels above it.
    cumulative_bits: u8,
}

impl Level {
    const fn new(bits: usize, cumulative_bits: usize) -> Self {
        Level {
            bits: bits as u8,
            cumulative_bits: cumulative_bits as u8,
        }
    }

    /// Number of key bits consumed by this level.
    pub const fn bits(&self) -> usize {
        self.bits as usize
    }

    /// Number of key bits consumed by this level and all the levels above it.
    pub const fn cumulative_bits(&self) -> usize {
        self.cumulative_bits as usize
    }

    /// Number of slots in an array of this level.
    pub const fn slots(&self) -> usize {
        1 << self.bits
    }

    /// The index into an array of this level for `key`.
    #[inline(always)]
    pub fn subkey(&self, key: Address) -> usize {
        (key >> (BITS_IN_ADDRESS - self.cumulative_bits())) & (self.slots() - 1)
    }
}

/// The level sequence of a tree.  It is computed once at construction, and is fully determined
/// by the number of significant bits and the number of bits per level.
///
/// Every level but the last consumes `bits_per_level` bits.  The last level takes the remainder,
/// which is at least 1 and at most `bits_per_level`.  For example, on 64-bit with 16 bits per
/// level, 64 significant bits give `[16, 16, 16, 16]`, 36 give `[16, 16, 4]`, and 8 give `[8]`.
///
/// The levels are stored inline so that computing the geometry never allocates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RTreeGeometry {
    significant_bits: u8,
    height: u8,
    levels: [Level; RTREE_HEIGHT_MAX],
}

impl RTreeGeometry {
    pub fn new(significant_bits: usize, bits_per_level: usize) -> Result<Self, RTreeError> {
        if significant_bits == 0 || significant_bits > BITS_IN_ADDRESS {
            return Err(RTreeError::InvalidSignificantBits {
                bits: significant_bits,
            });
        }
        if bits_per_level == 0 || bits_per_level > MAX_BITS_PER_LEVEL {
            return Err(RTreeError::InvalidGeometry { bits_per_level });
        }

        let height = significant_bits.div_ceil(bits_per_level);
        debug_assert!(height >= 1 && height <= RTREE_HEIGHT_MAX);

        let mut levels = [Level::default(); RTREE_HEIGHT_MAX];
        let mut cumulative_bits = 0;
        for (i, level) in levels[..height].iter_mut().enumerate() {
            let bits = if i + 1 < height {
                bits_per_level
            } else {
                significant_bits - cumulative_bits
            };
            cumulative_bits += bits;
            *level = Level::new(bits, cumulative_bits);
        }
        debug_assert_eq!(cumulative_bits, significant_bits);

        Ok(RTreeGeometry {
            significant_bits: significant_bits as u8,
            height: height as u8,
            levels,
        })
    }

    /// Number of high-order key bits used for indexing.
    pub const fn significant_bits(&self) -> usize {
        self.significant_bits as usize
    }

    /// Number of levels.
    pub const fn height(&self) -> usize {
        self.height as usize
    }

    /// The levels from the root to the leaves.
    pub fn levels(&self) -> &[Level] {
        &self.levels[..self.height()]
    }

    pub fn level(&self, depth: usize) -> &Level {
        &self.levels()[depth]
    }

    pub fn is_leaf(&self, depth: usize) -> bool {
        depth + 1 == self.height()
    }
}
