//! Benchmarks for lookups and writes on a populated tree.

use addr_rtree::{Address, RTree, SystemNodeAllocator};
use criterion::Criterion;
use std::hint::black_box;

const NUM_KEYS: usize = 4096;
// One key per 4 MB region, like the chunk records of an allocator.
const KEY_STRIDE: usize = 4 << 20;

fn prepare_keys() -> Vec<Address> {
    (0..NUM_KEYS)
        .map(|i| Address::from_usize(0x1000_0000 + i * KEY_STRIDE))
        .collect()
}

fn populated_tree(keys: &[Address], values: &mut [u64]) -> RTree<u64> {
    let tree = RTree::new(8 * std::mem::size_of::<usize>(), SystemNodeAllocator).unwrap();
    for (key, value) in keys.iter().zip(values.iter_mut()) {
        tree.set(*key, value).unwrap();
    }
    tree
}

pub fn bench_get(c: &mut Criterion) {
    let keys = prepare_keys();
    let mut values = vec![0u64; NUM_KEYS];
    let tree = populated_tree(&keys, &mut values);

    c.bench_function("rtree_get", |b| {
        b.iter(|| {
            let mut checksum = 0usize;
            for key in &keys {
                checksum ^= tree.get(black_box(*key)) as usize;
            }
            black_box(checksum);
        });
    });

    c.bench_function("rtree_get_dependent", |b| {
        b.iter(|| {
            let mut checksum = 0usize;
            for key in &keys {
                checksum ^= unsafe { tree.get_dependent(black_box(*key)) } as usize;
            }
            black_box(checksum);
        });
    });

    c.bench_function("rtree_get_absent", |b| {
        let absent = Address::MAX;
        b.iter(|| black_box(tree.get(black_box(absent))));
    });
}

pub fn bench_set(c: &mut Criterion) {
    let keys = prepare_keys();
    let mut values = vec![0u64; NUM_KEYS];

    c.bench_function("rtree_set_existing", |b| {
        let tree = populated_tree(&keys, &mut values);
        let value = &mut values[0] as *mut u64;
        b.iter(|| {
            for key in &keys {
                tree.set(black_box(*key), value).unwrap();
            }
        });
    });

    c.bench_function("rtree_populate", |b| {
        b.iter(|| black_box(populated_tree(&keys, &mut values)));
    });
}

pub fn bench(c: &mut Criterion) {
    bench_get(c);
    bench_set(c);
}
