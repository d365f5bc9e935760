use crate::util::node_alloc::{NodeAllocator, Slot, SystemNodeAllocator};
use std::collections::HashMap;
use std::panic;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

lazy_static::lazy_static! {
    // A global lock to make tests serial.
    // If we do want more parallelism, we can allow each set of tests to have their own locks. But it seems unnecessary for now.
    static ref SERIAL_TEST_LOCK: Mutex<()> = Mutex::default();
}

// force some tests to be executed serially
pub fn serial_test<F>(f: F)
where
    F: FnOnce(),
{
    // If one test fails, the lock will become poisoned. We would want to continue for other tests anyway.
    let _guard = SERIAL_TEST_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f();
}

// Always execute a cleanup closure no matter the test panics or not.
pub fn with_cleanup<T, C>(test: T, cleanup: C)
where
    T: FnOnce() + panic::UnwindSafe,
    C: FnOnce(),
{
    let res = panic::catch_unwind(test);
    cleanup();
    if let Err(e) = res {
        panic::resume_unwind(e);
    }
}

/// An allocation hook that keeps track of every array it hands out, and checks that each array
/// is released exactly once with the slot count it was allocated with.  It can also be told to
/// fail after a number of successful allocations.
pub struct CountingNodeAllocator<A: NodeAllocator = SystemNodeAllocator> {
    inner: A,
    /// Live arrays, keyed by address, with their slot counts.
    live: Mutex<HashMap<usize, usize>>,
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    /// Number of allocations that may still succeed.
    budget: AtomicUsize,
}

impl CountingNodeAllocator<SystemNodeAllocator> {
    pub fn new() -> Self {
        Self::wrap(SystemNodeAllocator)
    }

    /// Succeed for the first `allocations` requests, and fail afterwards.
    pub fn fail_after(allocations: usize) -> Self {
        let allocator = Self::new();
        allocator.set_budget(allocations);
        allocator
    }
}

impl Default for CountingNodeAllocator<SystemNodeAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: NodeAllocator> CountingNodeAllocator<A> {
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            live: Mutex::new(HashMap::new()),
            allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
            budget: AtomicUsize::new(usize::MAX),
        }
    }

    /// Allow `allocations` more successful allocations.
    pub fn set_budget(&self, allocations: usize) {
        self.budget.store(allocations, Ordering::SeqCst);
    }

    /// Number of arrays allocated and not yet released.
    pub fn live_nodes(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    /// Number of slots in all the live arrays.
    pub fn live_slots(&self) -> usize {
        self.live.lock().unwrap().values().sum()
    }

    /// Number of successful allocations.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Number of releases.
    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::SeqCst)
    }

    fn take_budget(&self) -> bool {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(1))
            .is_ok()
    }
}

impl<A: NodeAllocator> NodeAllocator for CountingNodeAllocator<A> {
    fn alloc_node(&self, count: usize) -> Option<NonNull<Slot>> {
        if !self.take_budget() {
            return None;
        }
        let node = self.inner.alloc_node(count)?;
        let old = self
            .live
            .lock()
            .unwrap()
            .insert(node.as_ptr() as usize, count);
        assert!(old.is_none(), "array {:p} handed out twice", node);
        self.allocations.fetch_add(1, Ordering::SeqCst);
        Some(node)
    }

    unsafe fn dealloc_node(&self, node: NonNull<Slot>, count: usize) {
        let allocated = self.live.lock().unwrap().remove(&(node.as_ptr() as usize));
        assert_eq!(
            allocated,
            Some(count),
            "array {:p} released with a wrong slot count, or not allocated by this hook",
            node
        );
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        self.inner.dealloc_node(node, count)
    }
}

impl<A: NodeAllocator> Drop for CountingNodeAllocator<A> {
    fn drop(&mut self) {
        // Do not double panic if a test has already failed.
        if !std::thread::panicking() {
            let live = self.live.get_mut().unwrap();
            assert!(live.is_empty(), "{} arrays were leaked", live.len());
        }
    }
}
