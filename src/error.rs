//! Error types for `shmrec`.

use thiserror::Error;

pub use crate::schema::SchemaError;

/// OS-level region create/open/unlink failures.
#[derive(Error, Debug)]
pub enum RegionError {
    #[error("region already exists: {0}")]
    AlreadyExists(String),
    #[error("region not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("requested region size too large: {0}")]
    TooLarge(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("platform error: {0}")]
    Platform(String),
}

/// Top-level error for all `shmrec` operations.
#[derive(Error, Debug)]
pub enum ShmError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("region error: {0}")]
    Region(#[from] RegionError),

    /// `finalize()` on a single-slot handle, `reset_modified` combined with
    /// `latest` in ring mode, or a `slots` constructor argument below 1.
    #[error("mode error: {0}")]
    Mode(String),

    /// A source value could not be coerced to the declared type at all.
    /// Distinct from truncation, which is reported via the status byte, not
    /// as an error.
    #[error("encode error: {0}")]
    Encode(String),
}

/// Result type for `shmrec` operations.
pub type ShmResult<T> = Result<T, ShmError>;
