//! Error handling for OpenCTM operations.
//!
//! Every fallible call returns a [`CtmError`]. The error carries a coarse
//! [`ErrorKind`] with a stable `CTM_*` name, plus a message describing what
//! went wrong.

use std::fmt;
use std::io;

use thiserror::Error;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was missing, empty or out of range.
    InvalidArgument,
    /// The call is not allowed in the current context mode.
    InvalidOperation,
    /// The mesh failed the topology or numeric integrity check.
    InvalidMesh,
    /// An allocation could not be satisfied.
    OutOfMemory,
    /// The backing store could not be opened, read or written.
    FileError,
    /// The byte stream is not a well formed OpenCTM stream.
    BadFormat,
    /// The stream was written with a format version this library does not read.
    UnsupportedFormatVersion,
    /// The entropy coding backend reported a failure.
    LzmaError,
    /// Broken internal invariant.
    InternalError,
}

impl ErrorKind {
    /// Returns the stable name of this error kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "CTM_INVALID_ARGUMENT",
            ErrorKind::InvalidOperation => "CTM_INVALID_OPERATION",
            ErrorKind::InvalidMesh => "CTM_INVALID_MESH",
            ErrorKind::OutOfMemory => "CTM_OUT_OF_MEMORY",
            ErrorKind::FileError => "CTM_FILE_ERROR",
            ErrorKind::BadFormat => "CTM_BAD_FORMAT",
            ErrorKind::UnsupportedFormatVersion => "CTM_UNSUPPORTED_FORMAT_VERSION",
            ErrorKind::LzmaError => "CTM_LZMA_ERROR",
            ErrorKind::InternalError => "CTM_INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CtmError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),
    #[error("Out of memory: {0}")]
    OutOfMemory(String),
    #[error("File error: {0}")]
    FileError(String),
    #[error("Bad format: {0}")]
    BadFormat(String),
    #[error("Unsupported format version: {0}")]
    UnsupportedFormatVersion(u32),
    #[error("LZMA error: {0}")]
    LzmaError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CtmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CtmError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CtmError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            CtmError::InvalidMesh(_) => ErrorKind::InvalidMesh,
            CtmError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            CtmError::FileError(_) => ErrorKind::FileError,
            CtmError::BadFormat(_) => ErrorKind::BadFormat,
            CtmError::UnsupportedFormatVersion(_) => ErrorKind::UnsupportedFormatVersion,
            CtmError::LzmaError(_) => ErrorKind::LzmaError,
            CtmError::InternalError(_) => ErrorKind::InternalError,
        }
    }

    pub fn bad_format(msg: impl Into<String>) -> Self {
        CtmError::BadFormat(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CtmError::InvalidArgument(msg.into())
    }
}

/// A truncated stream is a format error; anything else is an I/O failure of
/// the backing store.
impl From<io::Error> for CtmError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => CtmError::BadFormat(format!("unexpected end of stream: {}", err)),
            _ => CtmError::FileError(err.to_string()),
        }
    }
}

pub type Status = Result<(), CtmError>;

pub type CtmResult<T> = Result<T, CtmError>;

/// Creates an empty vector with room for `len` elements, reporting allocation
/// failure instead of aborting. Used for buffers whose size comes from an
/// untrusted header.
pub fn try_with_capacity<T>(len: usize) -> CtmResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| CtmError::OutOfMemory(format!("cannot allocate {} elements: {}", len, e)))?;
    Ok(v)
}
