/// Address of a memory region, the key type of the index.
pub mod address;
/// Constants describing the address width and the default tree shape.
pub mod constants;
/// Logger initialization
pub mod logger;
/// Mapping and unmapping pages with the OS.
#[cfg(unix)]
pub mod memory;
/// Allocation hooks for level arrays.
pub mod node_alloc;
/// Options for tuning the shape and checks of a tree.
pub mod options;
/// Wrappers for features missing from the standard library.
pub mod rust_util;
/// Helpers for unit tests, benchmarks and integration tests.
#[cfg(any(test, feature = "test_private"))]
pub mod test_util;

pub use self::address::Address;
