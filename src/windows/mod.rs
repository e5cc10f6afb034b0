//! Windows region backend (STUB).
//!
//! # Implementation Status: NOT YET IMPLEMENTED
//!
//! This module stubs the Windows side of the region backend. The actual
//! implementation will use `CreateFileMappingW` / `MapViewOfFile`.
//!
//! ## Windows Implementation Plan
//!
//! ```ignore
//! use windows::Win32::System::Memory::*;
//!
//! let mapping = CreateFileMappingW(
//!     INVALID_HANDLE_VALUE,
//!     None,
//!     PAGE_READWRITE,
//!     (size >> 32) as u32,
//!     size as u32,
//!     &HSTRING::from(format!("Local\\shmrec_{}", name)),
//! )?;
//!
//! let view = MapViewOfFile(mapping, FILE_MAP_ALL_ACCESS, 0, 0, size);
//! ```
//!
//! ### Naming Convention
//!
//! Regions map to `Local\shmrec_{name}`. The `Local\` prefix scopes the
//! object to the session namespace, appropriate for a per-user transport.
//!
//! ### Security Considerations
//!
//! 1. Supply explicit security descriptors if the process runs as a service.
//! 2. Use the `Global\` prefix if cross-session access is required.
//! 3. Handle `ERROR_ALREADY_EXISTS` when opening an existing mapping.
//!
//! Until this lands, Windows callers should vector through a different IPC
//! transport (named pipes, TCP localhost) rather than this crate.

use crate::error::RegionError;

type RegionResult<T> = Result<T, RegionError>;

pub(crate) fn region_name(name: &str) -> String {
    format!("Local\\shmrec_{name}")
}

pub(crate) fn create_region(name: &str, _size: usize) -> RegionResult<(*mut u8, i32)> {
    Err(RegionError::Platform(format!(
        "Windows region backend not yet implemented for '{name}'. See windows/mod.rs."
    )))
}

pub(crate) fn open_region(name: &str, _size: usize) -> RegionResult<(*mut u8, i32)> {
    Err(RegionError::Platform(format!(
        "Windows region backend not yet implemented for '{name}'. See windows/mod.rs."
    )))
}

/// # Safety
/// Never actually called today since [`create_region`]/[`open_region`]
/// always fail before producing a pointer to close.
pub(crate) unsafe fn close_region(_ptr: *mut u8, _size: usize, _fd: i32) {}

pub(crate) fn unlink_region(_name: &str) -> RegionResult<()> {
    Ok(())
}

// Note: when implementing, add to Cargo.toml:
//
// [target.'cfg(windows)'.dependencies]
// windows = { version = "0.58", features = [
//     "Win32_Foundation",
//     "Win32_System_Memory",
//     "Win32_Security",
// ]}
