//! This module works around limitations of the Rust programming language, and provides missing
//! functionalities that we may expect the Rust programming language and its standard libraries
//! to provide.

pub mod zeroed_alloc;

#[cfg(feature = "nightly")]
pub use core::intrinsics::likely;

// likely() compiler hint in stable Rust
// [1]: https://github.com/rust-lang/hashbrown/blob/a41bd76de0a53838725b997c6085e024c47a0455/src/raw/mod.rs#L48-L70
// [2]: https://users.rust-lang.org/t/compiler-hint-for-unlikely-likely-for-if-branches/62102/3
#[cfg(not(feature = "nightly"))]
#[cold]
fn cold() {}

#[cfg(not(feature = "nightly"))]
pub fn likely(b: bool) -> bool {
    if !b {
        cold();
    }
    b
}
