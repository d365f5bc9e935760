extern crate addr_rtree;

use addr_rtree::{Address, FnNodeAllocator, Options, RTree, RTreeError, Slot};
use std::sync::atomic::{AtomicUsize, Ordering};

fn node_alloc(count: usize) -> *mut Slot {
    unsafe { libc::calloc(count, std::mem::size_of::<Slot>()) as *mut Slot }
}

unsafe fn node_dalloc(node: *mut Slot, _count: usize) {
    libc::free(node as *mut libc::c_void)
}

const HOOKS: FnNodeAllocator = FnNodeAllocator::new(node_alloc, node_dalloc);

// Only used by `test_hooks_are_balanced`, as tests run in parallel.
static LIVE_NODES: AtomicUsize = AtomicUsize::new(0);

fn counting_node_alloc(count: usize) -> *mut Slot {
    let node = node_alloc(count);
    if !node.is_null() {
        LIVE_NODES.fetch_add(1, Ordering::SeqCst);
    }
    node
}

unsafe fn counting_node_dalloc(node: *mut Slot, count: usize) {
    LIVE_NODES.fetch_sub(1, Ordering::SeqCst);
    node_dalloc(node, count)
}

struct Chunk {
    base: Address,
}

#[test]
fn test_calloc_hooks() {
    // Trace output of the tree is visible with RUST_LOG=trace.
    let _ = addr_rtree::util::logger::try_init();
    let tree: RTree<Chunk, _> = RTree::new(48, HOOKS).unwrap();
    let mut chunk = Chunk {
        base: Address::from_usize(0x7f12_3440_0000),
    };
    tree.set(chunk.base, &mut chunk).unwrap();
    // Bits below the significant prefix are ignored.
    let found = tree.get(chunk.base + 4096usize);
    assert_eq!(found, &mut chunk as *mut Chunk);
    assert_eq!(unsafe { (*found).base }, Address::from_usize(0x7f12_3440_0000));
    tree.clear(chunk.base);
    assert!(tree.get(chunk.base).is_null());
}

#[test]
fn test_hooks_are_balanced() {
    let hooks = FnNodeAllocator::new(counting_node_alloc, counting_node_dalloc);
    let tree: RTree<Chunk, _> = RTree::new(8 * std::mem::size_of::<usize>(), hooks).unwrap();
    let mut chunks: Vec<Chunk> = (0..32usize)
        .map(|i| Chunk {
            base: Address::from_usize(i.rotate_right(5)),
        })
        .collect();
    for chunk in chunks.iter_mut() {
        let base = chunk.base;
        tree.set(base, chunk).unwrap();
    }
    assert_eq!(LIVE_NODES.load(Ordering::SeqCst), tree.node_count() + 1);
    tree.delete();
    assert_eq!(LIVE_NODES.load(Ordering::SeqCst), 0);
}

#[test]
fn test_invalid_construction() {
    assert_eq!(
        RTree::<Chunk, _>::new(0, HOOKS).unwrap_err(),
        RTreeError::InvalidSignificantBits { bits: 0 }
    );
    let bits = 8 * std::mem::size_of::<usize>() + 1;
    assert_eq!(
        RTree::<Chunk, _>::new(bits, HOOKS).unwrap_err(),
        RTreeError::InvalidSignificantBits { bits }
    );
}

#[test]
fn test_narrow_levels() {
    let mut options = Options::new();
    options.bits_per_level = 1;
    let width = 8 * std::mem::size_of::<usize>();
    let tree: RTree<Chunk, _> = RTree::with_options(width, HOOKS, &options).unwrap();
    assert_eq!(tree.height(), width);
    assert!(tree.levels().iter().all(|l| l.bits() == 1));

    let mut low = Chunk {
        base: Address::ZERO,
    };
    let mut high = Chunk {
        base: Address::MAX,
    };
    tree.set(low.base, &mut low).unwrap();
    tree.set(high.base, &mut high).unwrap();
    assert_eq!(tree.get(Address::ZERO), &mut low as *mut Chunk);
    assert_eq!(tree.get(Address::MAX), &mut high as *mut Chunk);
    assert!(tree.get(Address::from_usize(1)).is_null());
    // Two disjoint paths of width - 1 arrays each below the root.
    assert_eq!(tree.node_count(), 2 * (width - 1));
}

#[cfg(unix)]
#[test]
fn test_mmap_hooks() {
    use addr_rtree::MmapNodeAllocator;

    let tree: RTree<Chunk, _> = RTree::new(36, MmapNodeAllocator).unwrap();
    let mut chunks: Vec<Chunk> = (0..64usize)
        .map(|i| Chunk {
            base: Address::from_usize(i << 30),
        })
        .collect();
    for chunk in chunks.iter_mut() {
        let base = chunk.base;
        tree.set(base, chunk).unwrap();
    }
    for chunk in chunks.iter_mut() {
        assert_eq!(tree.get(chunk.base), chunk as *mut Chunk);
    }
}

#[test]
fn test_concurrent_get_and_set() {
    let tree: RTree<Chunk> = RTree::new(32, addr_rtree::SystemNodeAllocator).unwrap();
    let width = 8 * std::mem::size_of::<usize>();
    // Distinct significant prefixes that share the upper levels, so writers contend on them.
    let mut chunks: Vec<Chunk> = (0..1024usize)
        .map(|i| Chunk {
            base: Address::from_usize((i << (width - 32)) | 0x1000),
        })
        .collect();
    let prefixes: std::collections::HashSet<usize> =
        chunks.iter().map(|c| c.base.high_bits(32)).collect();
    assert_eq!(prefixes.len(), chunks.len());
    let entries: Vec<(Address, usize)> = chunks
        .iter_mut()
        .map(|c| (c.base, c as *mut Chunk as usize))
        .collect();

    std::thread::scope(|s| {
        for part in entries.chunks(entries.len() / 4 + 1) {
            let tree = &tree;
            s.spawn(move || {
                for (base, chunk) in part {
                    tree.set(*base, *chunk as *mut Chunk).unwrap();
                }
            });
        }
        for _ in 0..2 {
            let tree = &tree;
            let entries = &entries;
            s.spawn(move || {
                for (base, chunk) in entries {
                    let found = tree.get(*base) as usize;
                    assert!(found == 0 || found == *chunk);
                }
            });
        }
    });

    for (base, chunk) in entries.iter() {
        assert_eq!(tree.get(*base) as usize, *chunk);
    }
}
