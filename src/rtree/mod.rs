//! A radix tree that maps the significant bits of an address to a stored pointer.
//!
//! The tree has a fixed [geometry](RTreeGeometry): the top `significant_bits` bits of a key are
//! split into per-level chunks, most significant first, and each chunk indexes into an array of
//! [`Slot`]s of that level.  The root array is allocated when the tree is constructed.  All other
//! arrays are allocated lazily, through the [`NodeAllocator`] of the tree, by the first write
//! that needs them.  Arrays are only released when the tree is dropped: clearing a key leaves
//! the arrays on its path in place.
//!
//! # Concurrency
//!
//! All operations take `&self`.  [`RTree::get`] is lock-free and never writes.  [`RTree::set`]
//! builds all the arrays missing on the path of a key privately, and publishes them with a single
//! compare-and-swap, so a reader never observes a partially initialized array, and a failed
//! allocation never leaves anything reachable.  Concurrent writers that race on installing the
//! same array are resolved by the compare-and-swap, and the loser returns its arrays to the
//! allocation hook.  Stored values are published with release ordering and read with acquire
//! ordering.

mod geometry;
pub(crate) mod node;

pub use self::geometry::{Level, RTreeGeometry};
use self::node::Node;
pub use self::node::Slot;
use crate::util::node_alloc::{NodeAllocator, SystemNodeAllocator};
use crate::util::options::Options;
use crate::util::rust_util::likely;
use crate::util::Address;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Errors from constructing or writing a tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RTreeError {
    /// The number of significant bits is 0, or larger than the address width.
    InvalidSignificantBits { bits: usize },
    /// The number of bits per level is out of range, so no level sequence can be computed.
    InvalidGeometry { bits_per_level: usize },
    /// The allocation hook failed to provide an array of `slots` slots for `level`.  The tree
    /// is unchanged.
    OutOfMemory { level: usize, slots: usize },
}

impl fmt::Display for RTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RTreeError::InvalidSignificantBits { bits } => write!(
                f,
                "invalid number of significant bits: {} (expected 1 to {})",
                bits,
                crate::util::constants::BITS_IN_ADDRESS
            ),
            RTreeError::InvalidGeometry { bits_per_level } => write!(
                f,
                "cannot build levels with {} bits per level (expected 1 to {})",
                bits_per_level,
                crate::util::constants::MAX_BITS_PER_LEVEL
            ),
            RTreeError::OutOfMemory { level, slots } => write!(
                f,
                "failed to allocate a level-{} array of {} slots",
                level, slots
            ),
        }
    }
}

impl std::error::Error for RTreeError {}

/// A radix tree from addresses to `*mut T`.
///
/// The tree never dereferences the stored pointers, and never frees them.  It owns its level
/// arrays, and releases all of them through its allocation hook when it is dropped.
pub struct RTree<T, A: NodeAllocator = SystemNodeAllocator> {
    geometry: RTreeGeometry,
    /// The level-0 array.  It is always present.
    root: Node,
    allocator: A,
    verify_zeroed_nodes: bool,
    /// Number of non-root arrays reachable from the root.
    nodes: AtomicUsize,
    _value: PhantomData<*mut T>,
}

// The tree only hands out the stored pointers, and never dereferences them.
unsafe impl<T, A: NodeAllocator + Send> Send for RTree<T, A> {}
unsafe impl<T, A: NodeAllocator + Sync> Sync for RTree<T, A> {}

impl<T, A: NodeAllocator> RTree<T, A> {
    /// Create a tree that indexes the top `significant_bits` bits of keys, with the default
    /// [`Options`].
    pub fn new(significant_bits: usize, allocator: A) -> Result<Self, RTreeError> {
        Self::with_options(significant_bits, allocator, &Options::new())
    }

    /// Create a tree that indexes the top `significant_bits` bits of keys.  The root array is
    /// the only array allocated here.  If anything fails, nothing is left allocated.
    pub fn with_options(
        significant_bits: usize,
        allocator: A,
        options: &Options,
    ) -> Result<Self, RTreeError> {
        let geometry = RTreeGeometry::new(significant_bits, options.bits_per_level)?;
        let root_slots = geometry.level(0).slots();
        let root = allocator
            .alloc_node(root_slots)
            .map(Node::new)
            .ok_or(RTreeError::OutOfMemory {
                level: 0,
                slots: root_slots,
            })?;
        if options.verify_zeroed_nodes {
            Self::check_zeroed(root, root_slots, 0);
        }

        debug!(
            "Created RTree: {} significant bits, level bits {:?}",
            significant_bits,
            geometry.levels().iter().map(|l| l.bits()).collect::<Vec<_>>()
        );

        Ok(RTree {
            geometry,
            root,
            allocator,
            verify_zeroed_nodes: options.verify_zeroed_nodes,
            nodes: AtomicUsize::new(0),
            _value: PhantomData,
        })
    }

    /// Get the value stored for the significant bits of `key`, or null if there is none.
    ///
    /// This never allocates and never writes.  It stops at the first absent array on the path.
    #[inline]
    pub fn get(&self, key: Address) -> *mut T {
        let (leaf, upper) = self.split_levels();
        let mut node = self.root;
        for level in upper {
            let child = unsafe { node.slot(level.subkey(key)) }.load(Ordering::Acquire);
            match Node::from_child(child) {
                Some(next) => node = next,
                None => return std::ptr::null_mut(),
            }
        }
        unsafe { node.slot(leaf.subkey(key)) }.load(Ordering::Acquire) as *mut T
    }

    /// Get the value stored for `key`, skipping the checks for absent arrays.  This is for paths
    /// where the key is known to have been set before, such as looking up the record of a region
    /// that is being freed.
    ///
    /// # Safety
    ///
    /// `key` must have been passed to [`RTree::set`] with a non-null value that returned `Ok`
    /// (the value may have been cleared since).  Otherwise this dereferences a null pointer.
    #[inline]
    pub unsafe fn get_dependent(&self, key: Address) -> *mut T {
        let (leaf, upper) = self.split_levels();
        let mut node = self.root;
        for (depth, level) in upper.iter().enumerate() {
            let child = node.slot(level.subkey(key)).load(Ordering::Acquire);
            debug_assert!(
                !child.is_null(),
                "{} was never set: no level-{} array",
                key,
                depth + 1
            );
            node = Node::from_child_unchecked(child);
        }
        node.slot(leaf.subkey(key)).load(Ordering::Acquire) as *mut T
    }

    /// Store `value` for the significant bits of `key`, replacing any previous value.  Storing
    /// null clears the key.
    ///
    /// Missing arrays on the path are allocated.  If the allocation hook fails, this returns
    /// [`RTreeError::OutOfMemory`] and the tree is left as it was.  Clearing a key never
    /// allocates, and never fails: if an array on the path is absent, the key is already clear.
    pub fn set(&self, key: Address, value: *mut T) -> Result<(), RTreeError> {
        if value.is_null() {
            self.clear(key);
            return Ok(());
        }

        let slot = self.leaf_slot_for_write(key)?;
        slot.store(value as *mut (), Ordering::Release);
        Ok(())
    }

    /// Clear the value for `key`.  Same as `set(key, null)`.
    pub fn clear(&self, key: Address) {
        if let Some(slot) = self.leaf_slot(key) {
            slot.store(std::ptr::null_mut(), Ordering::Release);
        }
    }

    /// Release every array of the tree.  This is the same as dropping the tree.
    pub fn delete(self) {
        drop(self)
    }

    pub fn geometry(&self) -> &RTreeGeometry {
        &self.geometry
    }

    /// Number of high-order key bits used for indexing.
    pub fn significant_bits(&self) -> usize {
        self.geometry.significant_bits()
    }

    pub fn height(&self) -> usize {
        self.geometry.height()
    }

    pub fn levels(&self) -> &[Level] {
        self.geometry.levels()
    }

    /// Number of arrays allocated by writes so far, not counting the root.
    pub fn node_count(&self) -> usize {
        self.nodes.load(Ordering::Relaxed)
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    fn split_levels(&self) -> (&Level, &[Level]) {
        let levels = self.geometry.levels();
        let last = levels.len() - 1;
        (&levels[last], &levels[..last])
    }

    /// Find the leaf slot of `key` without allocating.
    fn leaf_slot(&self, key: Address) -> Option<&Slot> {
        let (leaf, upper) = self.split_levels();
        let mut node = self.root;
        for level in upper {
            let child = unsafe { node.slot(level.subkey(key)) }.load(Ordering::Acquire);
            node = Node::from_child(child)?;
        }
        Some(unsafe { node.slot(leaf.subkey(key)) })
    }

    /// Find the leaf slot of `key`, allocating the missing arrays on its path.
    fn leaf_slot_for_write(&self, key: Address) -> Result<&Slot, RTreeError> {
        let (leaf, upper) = self.split_levels();
        let mut node = self.root;
        for (depth, level) in upper.iter().enumerate() {
            let slot = unsafe { node.slot(level.subkey(key)) };
            let child = slot.load(Ordering::Acquire);
            if likely(!child.is_null()) {
                node = unsafe { Node::from_child_unchecked(child) };
                continue;
            }

            // Build the rest of the path privately, and publish it with one CAS.
            let chain = self.alloc_path(key, depth + 1)?;
            match slot.compare_exchange(
                std::ptr::null_mut(),
                chain.as_child(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let installed = upper.len() - depth;
                    self.nodes.fetch_add(installed, Ordering::Relaxed);
                    trace!(
                        "Installed {} arrays below level {} for {}",
                        installed,
                        depth,
                        key
                    );
                    node = chain;
                }
                Err(winner) => {
                    // Another writer installed the array first.  Use theirs.
                    trace!("Lost the race to install an array below level {} for {}", depth, key);
                    unsafe { self.free_path(chain, depth + 1, key) };
                    node = unsafe { Node::from_child_unchecked(winner) };
                }
            }
        }
        Ok(unsafe { node.slot(leaf.subkey(key)) })
    }

    fn alloc_level(&self, depth: usize) -> Result<Node, RTreeError> {
        let slots = self.geometry.level(depth).slots();
        let node = self
            .allocator
            .alloc_node(slots)
            .map(Node::new)
            .ok_or(RTreeError::OutOfMemory {
                level: depth,
                slots,
            })?;
        if self.verify_zeroed_nodes {
            Self::check_zeroed(node, slots, depth);
        }
        Ok(node)
    }

    /// Allocate the arrays for levels `first..height` on the path of `key`, each pointing to the
    /// next one.  Either all of them are allocated, or none.  The result is not reachable from
    /// the tree yet.
    fn alloc_path(&self, key: Address, first: usize) -> Result<Node, RTreeError> {
        let last = self.geometry.height() - 1;
        debug_assert!(first >= 1 && first <= last);

        let mut head = self.alloc_level(last)?;
        for depth in (first..last).rev() {
            let node = match self.alloc_level(depth) {
                Ok(node) => node,
                Err(e) => {
                    unsafe { self.free_path(head, depth + 1, key) };
                    return Err(e);
                }
            };
            // The CAS that publishes the path orders this store before any reader.
            unsafe { node.slot(self.geometry.level(depth).subkey(key)) }
                .store(head.as_child(), Ordering::Relaxed);
            head = node;
        }
        Ok(head)
    }

    /// Free a path built by [`RTree::alloc_path`] that was never published.
    unsafe fn free_path(&self, head: Node, first: usize, key: Address) {
        let mut node = Some(head);
        for depth in first..self.geometry.height() {
            let Some(current) = node else {
                break;
            };
            let level = self.geometry.level(depth);
            node = if self.geometry.is_leaf(depth) {
                None
            } else {
                Node::from_child(current.slot(level.subkey(key)).load(Ordering::Relaxed))
            };
            self.allocator.dealloc_node(current.as_non_null(), level.slots());
        }
    }

    /// Free `node` and every array below it, children first.  Returns the number of arrays freed.
    unsafe fn free_subtree(&mut self, node: Node, depth: usize) -> usize {
        let slots = self.geometry.level(depth).slots();
        let mut freed = 1;
        if !self.geometry.is_leaf(depth) {
            for slot in node.slots(slots) {
                if let Some(child) = Node::from_child(slot.load(Ordering::Relaxed)) {
                    freed += self.free_subtree(child, depth + 1);
                }
            }
        }
        self.allocator.dealloc_node(node.as_non_null(), slots);
        freed
    }

    fn check_zeroed(node: Node, slots: usize, depth: usize) {
        let array = unsafe { node.slots(slots) };
        if let Some(i) = array.iter().position(|s| !s.is_null()) {
            panic!(
                "The allocation hook returned a level-{} array that is not zero-filled (slot {} is {:?})",
                depth, i, array[i]
            );
        }
    }
}

impl<T, A: NodeAllocator> Drop for RTree<T, A> {
    fn drop(&mut self) {
        let root = self.root;
        let freed = unsafe { self.free_subtree(root, 0) };
        debug_assert_eq!(freed, self.node_count() + 1);
        debug!("Deleted RTree: released {} arrays", freed);
    }
}

impl<T, A: NodeAllocator> fmt::Debug for RTree<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTree")
            .field("significant_bits", &self.significant_bits())
            .field("levels", &self.levels())
            .field("nodes", &self.node_count())
            .finish()
    }
}
