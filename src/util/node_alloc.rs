//! Allocation hooks for the level arrays of a tree.
//!
//! A tree never calls the global allocator for its level arrays.  Every array is obtained from,
//! and returned to, the [`NodeAllocator`] that the owner injects at construction.  An allocator
//! that embeds the index can then serve the arrays from its own internal (base) allocator without
//! re-entering its public entry points.

pub use crate::rtree::node::Slot;
use crate::util::rust_util::zeroed_alloc::{free_zeroed_array, new_zeroed_array};
use std::ptr::NonNull;

/// The allocation hook of a tree.
///
/// Implementations must not call back into any tree that they serve.
pub trait NodeAllocator {
    /// Allocate a zero-filled array of `count` slots, or return `None` if the request cannot be
    /// satisfied.  The array must be aligned for [`Slot`].
    fn alloc_node(&self, count: usize) -> Option<NonNull<Slot>>;

    /// Release an array.  A failure to release cannot be reported to the tree, and has to be
    /// handled here (e.g. logged, or treated as fatal).
    ///
    /// # Safety
    ///
    /// `node` must have been returned by `self.alloc_node(count)` with the same `count`, and it
    /// must not be used after this call.
    unsafe fn dealloc_node(&self, node: NonNull<Slot>, count: usize);
}

impl<A: NodeAllocator + ?Sized> NodeAllocator for &A {
    fn alloc_node(&self, count: usize) -> Option<NonNull<Slot>> {
        (**self).alloc_node(count)
    }

    unsafe fn dealloc_node(&self, node: NonNull<Slot>, count: usize) {
        (**self).dealloc_node(node, count)
    }
}

/// Level arrays from the Rust global allocator.
///
/// Do not use this from a tree that lives inside a `#[global_allocator]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNodeAllocator;

impl NodeAllocator for SystemNodeAllocator {
    fn alloc_node(&self, count: usize) -> Option<NonNull<Slot>> {
        new_zeroed_array::<Slot>(count)
    }

    unsafe fn dealloc_node(&self, node: NonNull<Slot>, count: usize) {
        free_zeroed_array(node, count)
    }
}

/// Allocates a zero-filled array of the given number of slots, or returns null.
pub type AllocNodeFn = fn(usize) -> *mut Slot;
/// Releases an array returned by an [`AllocNodeFn`] with the same number of slots.
pub type DeallocNodeFn = unsafe fn(*mut Slot, usize);

/// Level arrays from a pair of plain functions, such as wrappers of `calloc` and `free`, or the
/// base allocator of the enclosing memory allocator.
#[derive(Clone, Copy)]
pub struct FnNodeAllocator {
    alloc: AllocNodeFn,
    dealloc: DeallocNodeFn,
}

impl FnNodeAllocator {
    pub const fn new(alloc: AllocNodeFn, dealloc: DeallocNodeFn) -> Self {
        Self { alloc, dealloc }
    }
}

impl std::fmt::Debug for FnNodeAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FnNodeAllocator({:p}, {:p})", self.alloc, self.dealloc)
    }
}

impl NodeAllocator for FnNodeAllocator {
    fn alloc_node(&self, count: usize) -> Option<NonNull<Slot>> {
        let node = (self.alloc)(count);
        debug_assert!(
            node as usize % std::mem::align_of::<Slot>() == 0,
            "allocation hook returned a misaligned array: {:p}",
            node
        );
        NonNull::new(node)
    }

    unsafe fn dealloc_node(&self, node: NonNull<Slot>, count: usize) {
        (self.dealloc)(node.as_ptr(), count)
    }
}

#[cfg(unix)]
pub use self::mmap::MmapNodeAllocator;

#[cfg(unix)]
mod mmap {
    use super::*;
    use crate::util::memory;
    use crate::util::Address;

    /// Level arrays mapped directly from the OS.
    ///
    /// Every array occupies whole pages of an anonymous mapping, so it is zero-filled on demand
    /// and never touches a user-space heap.  This is the natural choice for a tree that lives
    /// inside a global allocator.  Arrays smaller than a page waste the rest of the page, so this
    /// suits the default (wide) tree shape best.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct MmapNodeAllocator;

    impl MmapNodeAllocator {
        fn mapping_bytes(count: usize) -> Option<usize> {
            let bytes = count.checked_mul(std::mem::size_of::<Slot>())?;
            if bytes > isize::MAX as usize {
                return None;
            }
            Some(memory::page_align_up(bytes))
        }
    }

    impl NodeAllocator for MmapNodeAllocator {
        fn alloc_node(&self, count: usize) -> Option<NonNull<Slot>> {
            let bytes = Self::mapping_bytes(count)?;
            match memory::dzmmap_anywhere(bytes) {
                Ok(start) => NonNull::new(start.to_mut_ptr::<Slot>()),
                Err(e) => {
                    debug!("Failed to map {} bytes for a level array: {}", bytes, e);
                    None
                }
            }
        }

        unsafe fn dealloc_node(&self, node: NonNull<Slot>, count: usize) {
            // The size was valid when the array was allocated.
            let bytes = memory::page_align_up(count * std::mem::size_of::<Slot>());
            let start = Address::from_mut_ptr(node.as_ptr());
            if let Err(e) = memory::munmap(start, bytes) {
                error!(
                    "Failed to unmap level array {} ({} bytes): {}",
                    start, bytes, e
                );
            }
        }
    }
}
