//! This module is for allocating arrays with initial zero values, without running any constructor
//! on the elements.
//!
//! Level arrays of the tree can be large (`1 << 16` slots with the default shape), and most of
//! them stay sparse.  `alloc_zeroed` may hand out demand-zero pages without touching every slot.
use bytemuck::Zeroable;
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

/// Allocate an array of `count` all-zero values of type `T` with the global allocator.
///
/// Returns `None` if the layout overflows or the allocator fails.  A zero-sized request never
/// reaches the allocator and returns a dangling pointer instead.
///
/// Because `T: Zeroable`, an all-zero `T` is a valid value and the array can be used as is.
pub fn new_zeroed_array<T: Zeroable>(count: usize) -> Option<NonNull<T>> {
    let layout = Layout::array::<T>(count).ok()?;
    if layout.size() == 0 {
        return Some(NonNull::dangling());
    }
    NonNull::new(unsafe { alloc_zeroed(layout) } as *mut T)
}

/// Free an array returned by [`new_zeroed_array`].
///
/// # Safety
///
/// `array` must have been returned by `new_zeroed_array::<T>(count)` with the same `count`, and
/// must not be used after this call.
pub unsafe fn free_zeroed_array<T: Zeroable>(array: NonNull<T>, count: usize) {
    let layout = Layout::array::<T>(count).unwrap_unchecked();
    if layout.size() != 0 {
        dealloc(array.as_ptr() as *mut u8, layout);
    }
}
