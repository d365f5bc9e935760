use bytemuck::Zeroable;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, Ordering};

/// One entry of a level array.  In the last level, a slot holds a stored value, and in any
/// other level, it holds a pointer to an array of the next level.  Null means absent in both
/// cases, so a zero-filled array is an empty array.
#[repr(transparent)]
pub struct Slot(AtomicPtr<()>);

// SAFETY: `Slot` is a transparent wrapper of a pointer, and the all-zero pointer is null.
unsafe impl Zeroable for Slot {}

assert_eq_size!(Slot, usize);

impl Slot {
    pub const fn null() -> Self {
        Slot(AtomicPtr::new(std::ptr::null_mut()))
    }

    pub fn is_null(&self) -> bool {
        self.0.load(Ordering::Relaxed).is_null()
    }

    pub(crate) fn load(&self, order: Ordering) -> *mut () {
        self.0.load(order)
    }

    pub(crate) fn store(&self, ptr: *mut (), order: Ordering) {
        self.0.store(ptr, order)
    }

    pub(crate) fn compare_exchange(
        &self,
        current: *mut (),
        new: *mut (),
        success: Ordering,
        failure: Ordering,
    ) -> Result<*mut (), *mut ()> {
        self.0.compare_exchange(current, new, success, failure)
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({:p})", self.0.load(Ordering::Relaxed))
    }
}

/// A level array.  This is a plain pointer, and it does not know its own length.  The length is
/// given by the level the array belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Node(NonNull<Slot>);

impl Node {
    pub(crate) fn new(array: NonNull<Slot>) -> Self {
        Node(array)
    }

    /// Interpret the content of a non-leaf slot.
    pub(crate) fn from_child(ptr: *mut ()) -> Option<Node> {
        NonNull::new(ptr as *mut Slot).map(Node)
    }

    /// Interpret the content of a non-leaf slot that is known to be non-null.
    ///
    /// # Safety
    ///
    /// `ptr` must not be null.
    pub(crate) unsafe fn from_child_unchecked(ptr: *mut ()) -> Node {
        Node(NonNull::new_unchecked(ptr as *mut Slot))
    }

    /// The value to store in a non-leaf slot to point to this array.
    pub(crate) fn as_child(self) -> *mut () {
        self.0.as_ptr() as *mut ()
    }

    pub(crate) fn as_non_null(self) -> NonNull<Slot> {
        self.0
    }

    /// # Safety
    ///
    /// The array must be live for `'a`, and `index` must be in bounds.
    #[inline(always)]
    pub(crate) unsafe fn slot<'a>(self, index: usize) -> &'a Slot {
        &*self.0.as_ptr().add(index)
    }

    /// # Safety
    ///
    /// The array must be live for `'a`, and have `count` slots.
    pub(crate) unsafe fn slots<'a>(self, count: usize) -> &'a [Slot] {
        std::slice::from_raw_parts(self.0.as_ptr(), count)
    }
}
