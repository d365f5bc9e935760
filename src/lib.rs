// Allow this for now.
#![allow(clippy::missing_safety_doc)]
#![cfg_attr(feature = "nightly", feature(core_intrinsics))]

//! A radix tree that maps machine addresses to out-of-band metadata records.
//!
//! An allocator keeps a descriptor record for every region it manages, and needs to get from a
//! raw address back to that record on every allocation and deallocation.  [`RTree`] answers
//! "which record, if any, is associated with this address" with a fixed number of dependent
//! loads, regardless of the key or the history of the tree.
//!
//! The tree is configured with a number of *significant bits*.  Only the top
//! `significant_bits` bits of a key are used for indexing, and the low-order bits below that
//! threshold are ignored, matching the minimum alignment of the regions the allocator hands out.
//! The significant prefix is sliced into per-level chunks (see [`rtree::RTreeGeometry`]), and
//! the level arrays are allocated lazily on the first write that needs them.
//!
//! All level arrays are obtained through an injected [`NodeAllocator`] rather than the global
//! allocator, so that an allocator embedding this index never re-enters itself.  Available
//! hooks are:
//!
//! * [`SystemNodeAllocator`]: the Rust global allocator.  Good for everything that is not itself
//!   a global allocator.
//! * [`FnNodeAllocator`]: a pair of plain functions, such as `calloc` and `free`.
//! * [`MmapNodeAllocator`]: demand-zero pages straight from the OS (unix only).
//!
//! ```ignore
//! use addr_rtree::{Address, RTree, SystemNodeAllocator};
//!
//! let tree: RTree<Extent> = RTree::new(48, SystemNodeAllocator)?;
//! tree.set(Address::from_ptr(chunk), extent)?;
//! assert_eq!(tree.get(Address::from_ptr(chunk)), extent);
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate static_assertions;

/// The radix tree and its level geometry.
pub mod rtree;
/// Utilities shared by the index: address type, allocation hooks, options, logging.
pub mod util;

pub use crate::rtree::{RTree, RTreeError};
pub use crate::util::node_alloc::{FnNodeAllocator, NodeAllocator, Slot, SystemNodeAllocator};
#[cfg(unix)]
pub use crate::util::node_alloc::MmapNodeAllocator;
pub use crate::util::options::Options;
pub use crate::util::Address;
