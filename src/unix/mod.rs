//! Unix (macOS/Linux) region backend.
//!
//! Uses POSIX shared memory (`shm_open`) and `mmap` for zero-copy IPC.
//!
//! # Shared Memory Lifecycle
//!
//! 1. Creator calls `shm_open(O_CREAT | O_EXCL)`, sizes it with `ftruncate`.
//! 2. Creator maps it with `mmap(PROT_READ | PROT_WRITE)`.
//! 3. Openers call `shm_open(O_RDWR)` with the size the caller already
//!    computed from its own compiled schema. There is no self-describing
//!    header in the region to read a size from; the schema is the ABI.
//! 4. `close` unmaps and closes the descriptor; `unlink` removes the name.
//!
//! # Naming Convention
//!
//! Shared memory objects are named `/shmrec_{name}`. POSIX requires the
//! leading `/`; macOS additionally limits names to 31 characters total.

use std::ffi::CString;
use std::ptr;

use libc::{
    c_int, c_uint, c_void, close, ftruncate, mmap, munmap, off_t, shm_open, shm_unlink,
    MAP_FAILED, MAP_SHARED, O_CREAT, O_EXCL, O_RDWR, PROT_READ, PROT_WRITE, S_IRUSR, S_IWUSR,
};

use crate::error::RegionError;

/// Build the POSIX shm name for a caller-supplied region name.
///
/// macOS limits shm names to 31 characters including the leading `/`; we
/// truncate the caller's name to stay within that limit on every platform,
/// for consistent behavior.
pub fn region_name(name: &str) -> String {
    const PREFIX: &str = "/shmrec_";
    let budget = 31 - PREFIX.len();
    let truncated = if name.len() > budget {
        &name[..budget]
    } else {
        name
    };
    format!("{PREFIX}{truncated}")
}

type RegionResult<T> = Result<T, RegionError>;

/// Map an OS error from a region syscall to the matching `RegionError` kind,
/// falling back to the raw `Io` variant for anything not otherwise named.
fn classify(name: &str, err: std::io::Error) -> RegionError {
    match err.kind() {
        std::io::ErrorKind::AlreadyExists => RegionError::AlreadyExists(name.to_string()),
        std::io::ErrorKind::NotFound => RegionError::NotFound(name.to_string()),
        std::io::ErrorKind::PermissionDenied => RegionError::PermissionDenied(name.to_string()),
        _ => match err.raw_os_error() {
            Some(libc::EFBIG) | Some(libc::EINVAL) | Some(libc::ENAMETOOLONG) => {
                RegionError::TooLarge(name.to_string())
            }
            _ => RegionError::Io(err),
        },
    }
}

/// Create and map a new region.
///
/// # Safety
/// Returns a raw pointer to mapped memory. Caller must ensure the mapping is
/// unmapped exactly once and that concurrent access follows the slot
/// protocol's single-writer discipline.
pub(crate) fn create_region(name: &str, size: usize) -> RegionResult<(*mut u8, c_int)> {
    let c_name = CString::new(name).map_err(|e| RegionError::Platform(e.to_string()))?;

    unsafe {
        let fd = shm_open(
            c_name.as_ptr(),
            O_CREAT | O_EXCL | O_RDWR,
            (S_IRUSR | S_IWUSR) as c_uint,
        );

        if fd == -1 {
            let err = std::io::Error::last_os_error();
            return Err(classify(name, err));
        }

        if ftruncate(fd, size as off_t) == -1 {
            let err = std::io::Error::last_os_error();
            close(fd);
            shm_unlink(c_name.as_ptr());
            return Err(classify(name, err));
        }

        let ptr = mmap(ptr::null_mut(), size, PROT_READ | PROT_WRITE, MAP_SHARED, fd, 0);

        if ptr == MAP_FAILED {
            let err = std::io::Error::last_os_error();
            close(fd);
            shm_unlink(c_name.as_ptr());
            return Err(classify(name, err));
        }

        Ok((ptr as *mut u8, fd))
    }
}

/// Open an existing region of the given expected size.
///
/// # Safety
/// Returns a raw pointer to mapped memory. Caller must ensure the mapping is
/// unmapped exactly once.
pub(crate) fn open_region(name: &str, size: usize) -> RegionResult<(*mut u8, c_int)> {
    let c_name = CString::new(name).map_err(|e| RegionError::Platform(e.to_string()))?;

    unsafe {
        let fd = shm_open(c_name.as_ptr(), O_RDWR, 0);

        if fd == -1 {
            let err = std::io::Error::last_os_error();
            return Err(classify(name, err));
        }

        let ptr = mmap(ptr::null_mut(), size, PROT_READ | PROT_WRITE, MAP_SHARED, fd, 0);

        if ptr == MAP_FAILED {
            let err = std::io::Error::last_os_error();
            close(fd);
            return Err(classify(name, err));
        }

        Ok((ptr as *mut u8, fd))
    }
}

/// Unmap and close a region.
///
/// # Safety
/// Must only be called once per mapping.
pub(crate) unsafe fn close_region(ptr: *mut u8, size: usize, fd: c_int) {
    if !ptr.is_null() {
        munmap(ptr as *mut c_void, size);
    }
    if fd >= 0 {
        close(fd);
    }
}

/// Remove the named region. Only the creator/owner should call this.
pub(crate) fn unlink_region(name: &str) -> RegionResult<()> {
    let c_name = CString::new(name).map_err(|e| RegionError::Platform(e.to_string()))?;

    unsafe {
        if shm_unlink(c_name.as_ptr()) == -1 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ENOENT) {
                return Err(RegionError::Io(err));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_name_truncates_for_macos_limit() {
        let long = "a".repeat(64);
        let name = region_name(&long);
        assert!(name.len() <= 31);
        assert!(name.starts_with("/shmrec_"));
    }

    #[test]
    fn create_then_open_then_unlink() {
        let name = region_name(&format!("test_{}", uuid::Uuid::new_v4().simple()));
        let (ptr, fd) = create_region(&name, 64).unwrap();
        unsafe {
            *ptr = 7;
            close_region(ptr, 64, fd);
        }

        let (ptr2, fd2) = open_region(&name, 64).unwrap();
        unsafe {
            assert_eq!(*ptr2, 7);
            close_region(ptr2, 64, fd2);
        }

        unlink_region(&name).unwrap();
        assert!(open_region(&name, 64).is_err());
    }

    #[test]
    fn create_twice_fails() {
        let name = region_name(&format!("dup_{}", uuid::Uuid::new_v4().simple()));
        let (ptr, fd) = create_region(&name, 64).unwrap();
        let second = create_region(&name, 64);
        assert!(matches!(second, Err(RegionError::AlreadyExists(_))));
        unsafe {
            close_region(ptr, 64, fd);
        }
        unlink_region(&name).unwrap();
    }
}
