use crate::util::constants::BYTES_IN_PAGE;
use crate::util::Address;
use std::io::{Error, Result};

/// Round `bytes` up to a whole number of pages.
pub const fn page_align_up(bytes: usize) -> usize {
    (bytes + BYTES_IN_PAGE - 1) & !(BYTES_IN_PAGE - 1)
}

/// Demand-zero mmap at an address of the OS' choosing:
/// This function guarantees to zero all mapped memory.
pub fn dzmmap_anywhere(size: usize) -> Result<Address> {
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE;
    let ret = unsafe { libc::mmap(std::ptr::null_mut(), size, prot, flags, -1, 0) };
    if ret == libc::MAP_FAILED {
        Err(Error::last_os_error())
    } else {
        // Anonymous private mappings are zero-filled on every unix we support.
        Ok(Address::from_mut_ptr(ret))
    }
}

/// Unmap memory previously returned by [`dzmmap_anywhere`].
pub fn munmap(start: Address, size: usize) -> Result<()> {
    wrap_libc_call(
        &|| unsafe { libc::munmap(start.to_mut_ptr(), size) },
        0,
    )
}

fn wrap_libc_call<T: PartialEq>(f: &dyn Fn() -> T, expect: T) -> Result<()> {
    let ret = f();
    if ret == expect {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_align_up() {
        assert_eq!(page_align_up(0), 0);
        assert_eq!(page_align_up(1), BYTES_IN_PAGE);
        assert_eq!(page_align_up(BYTES_IN_PAGE), BYTES_IN_PAGE);
        assert_eq!(page_align_up(BYTES_IN_PAGE + 1), BYTES_IN_PAGE * 2);
    }

    #[test]
    fn test_mmap_munmap() {
        let start = dzmmap_anywhere(BYTES_IN_PAGE).unwrap();
        assert!(start.is_aligned_to(BYTES_IN_PAGE));
        let bytes = unsafe { std::slice::from_raw_parts(start.to_mut_ptr::<u8>(), BYTES_IN_PAGE) };
        assert!(bytes.iter().all(|b| *b == 0));
        assert!(munmap(start, BYTES_IN_PAGE).is_ok());
    }
}
