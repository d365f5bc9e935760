/// log2 of the number of bits in a byte
pub const LOG_BITS_IN_BYTE: u8 = 3;
/// The number of bits in a byte
pub const BITS_IN_BYTE: usize = 1 << LOG_BITS_IN_BYTE;

#[cfg(target_pointer_width = "32")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 2;
#[cfg(target_pointer_width = "64")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 3;
/// The number of bytes in an address
pub const BYTES_IN_ADDRESS: usize = 1 << LOG_BYTES_IN_ADDRESS;
/// log2 of the number of bits in an address
pub const LOG_BITS_IN_ADDRESS: usize = LOG_BITS_IN_BYTE as usize + LOG_BYTES_IN_ADDRESS as usize;
/// The number of bits in an address
pub const BITS_IN_ADDRESS: usize = 1 << LOG_BITS_IN_ADDRESS;

/// log2 of the number of bytes in a page
pub const LOG_BYTES_IN_PAGE: u8 = 12;
/// The number of bytes in a page
pub const BYTES_IN_PAGE: usize = 1 << LOG_BYTES_IN_PAGE;

/// log2 of the default number of key bits consumed by one level of the tree.
pub const LOG_RTREE_BITS_PER_LEVEL: usize = 4;
/// The default number of key bits consumed by one level of the tree.  A level array has
/// `1 << RTREE_BITS_PER_LEVEL` slots, so this trades array size against tree depth.
pub const RTREE_BITS_PER_LEVEL: usize = 1 << LOG_RTREE_BITS_PER_LEVEL;
/// The largest number of bits a single level may consume.  A level array of this width takes
/// `BYTES_IN_ADDRESS << MAX_BITS_PER_LEVEL` bytes (128 MiB on 64-bit).
pub const MAX_BITS_PER_LEVEL: usize = 24;
/// The maximum height of a tree.  It is reached with one bit per level and all address bits
/// significant.
pub const RTREE_HEIGHT_MAX: usize = BITS_IN_ADDRESS;

const_assert!(RTREE_BITS_PER_LEVEL <= MAX_BITS_PER_LEVEL);
const_assert!(MAX_BITS_PER_LEVEL < BITS_IN_ADDRESS);
