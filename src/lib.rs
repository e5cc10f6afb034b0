//! Lock-free shared-memory transport for structured records.
//!
//! A record type is declared once as a [`Schema`]: a named, ordered list of
//! typed fields (scalars, bounded UTF-8 strings, fixed-shape numeric
//! arrays). Compiling the schema yields a deterministic byte [`Layout`];
//! provisioning a named region of that shape gives a [`SharedMemory`]
//! handle with `publish`/`consume` operations and per-field freshness
//! metadata.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                    ┌─────────────────┐
//! │     Writer       │                    │     Reader       │
//! └────────┬─────────┘                    └────────┬─────────┘
//!          │ publish()/finalize()                  │ consume()
//!          ▼                                       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Shared Memory Region                    │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │ [ring metadata]? | Slot 0 | Slot 1 | ... | Slot N-1 ││
//! │  │ each slot: seq_begin | status bytes | fields | seq_end││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no self-describing prefix and no version tag in the region
//! itself. The schema is the ABI. Two processes interoperate iff they
//! compiled identical schemas and run on the same (native, little-endian)
//! host.
//!
//! # Platform Support
//!
//! | Platform | Status | Implementation |
//! |----------|--------|----------------|
//! | macOS/Linux | Implemented | POSIX shm + mmap |
//! | Windows | Stub | Planned: named shared memory |
//!
//! See the [`windows`] module for the Windows implementation plan.
//!
//! # Usage
//!
//! ```ignore
//! use shmrec::{FieldDescriptor, FieldValue, ScalarType, Schema, SharedMemory};
//! use std::time::Duration;
//!
//! let schema = Schema::new(vec![
//!     FieldDescriptor::scalar("v", ScalarType::F64),
//!     FieldDescriptor::scalar("n", ScalarType::I32),
//! ])?;
//!
//! let mut writer = SharedMemory::new(schema.clone(), Some("demo"), 1, true)?;
//! writer.publish([("v", FieldValue::F64(42.0)), ("n", FieldValue::I32(10))])?;
//!
//! let mut reader = SharedMemory::new(schema, Some("demo"), 1, false)?;
//! if let Some(record) = reader.consume(Duration::ZERO, false, false)? {
//!     assert!(record["v"].valid());
//! }
//! # Ok::<(), shmrec::ShmError>(())
//! ```
//!
//! # Thread Safety
//!
//! A [`SharedMemory`] handle is single-threaded: one writer process, one or
//! many reader processes, and never more than one thread driving a given
//! handle at a time (see the concurrency notes in `DESIGN.md`).
//!
//! # Concurrency model
//!
//! Cross-process consistency is lock-free: a seqlock around each slot
//! detects torn reads and retries transparently, and multi-slot regions use
//! an overwrite-oldest ring with three metadata counters. See the `slot` and
//! `ring` modules for the exact write/read sequences.

mod codec;
pub mod error;
mod handle;
mod ring;
pub mod schema;
mod slot;
pub mod value;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

pub use error::{RegionError, ShmError, ShmResult};
pub use handle::{Record, SharedMemory};
pub use schema::{ElementType, FieldDescriptor, FieldKind, Layout, ScalarType, Schema, SchemaError};
pub use value::{ArrayData, Field, FieldValue, StatusFlags};

/// Check whether this platform has a working region backend.
pub fn is_available() -> bool {
    #[cfg(unix)]
    {
        true
    }
    #[cfg(windows)]
    {
        false
    }
    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_available() {
        #[cfg(unix)]
        assert!(is_available());

        #[cfg(windows)]
        assert!(!is_available());
    }
}
