//! Centralized error handling for paramfile.
//!
//! Every failure in the crate is surfaced as a [`ParamFileError`] through the
//! [`Result`] alias. Nothing is recovered internally: a failing call returns
//! the error to its caller and leaves any buffers it already copied in place.
//!
//! ## Error Categories
//!
//! - **Invalid argument** ([`ParamFileError::InvalidArgument`]): a malformed key,
//!   raised before any I/O happens.
//! - **I/O** ([`ParamFileError::Io`]): a file could not be opened, read, written or seeked.
//! - **Runtime** ([`ParamFileError::Format`], [`ParamFileError::Mismatch`],
//!   [`ParamFileError::KeyNotFound`]): the file content does not agree with the
//!   request. See [`ParamFileError::is_runtime`].
//!
//! ## Usage
//!
//! ```rust
//! use paramfile::{ModelReader, ParamFileError};
//!
//! let reader = ModelReader::from_bytes(Vec::new());
//! let mut model = paramfile::Model::new();
//! match reader.load_param(&mut model, "/missing") {
//!     Err(ParamFileError::KeyNotFound(key)) => assert_eq!(key, "/missing"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for paramfile operations.
pub type Result<T> = std::result::Result<T, ParamFileError>;

/// The error enum covering every failure domain of the reader and writer.
///
/// I/O errors are wrapped in `Arc` so the whole type stays `Clone`.
#[derive(Debug, Clone)]
pub enum ParamFileError {
    /// A key contains reserved characters, lacks a required leading `/`,
    /// or is empty where an exact target is required.
    InvalidArgument(String),

    /// Low-level I/O failure while opening, reading, writing or seeking.
    Io(Arc<io::Error>),

    /// The file does not follow the record framing: unparsable header line,
    /// unknown record tag, or a payload that does not decode to the declared shape.
    Format(String),

    /// The file is well formed but disagrees with the target collection or handle:
    /// shape mismatch, more records than handles, or a record count mismatch
    /// after a full populate.
    Mismatch(String),

    /// An exact-key lookup reached end of file without a matching record.
    /// Carries the requested key.
    KeyNotFound(String),
}

impl ParamFileError {
    /// Returns true for the runtime (format-fatal) class of errors:
    /// [`Format`](Self::Format), [`Mismatch`](Self::Mismatch) and
    /// [`KeyNotFound`](Self::KeyNotFound).
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::Mismatch(_) | Self::KeyNotFound(_)
        )
    }

    /// Wraps an I/O error so its message names the file involved.
    /// The original [`io::ErrorKind`] is preserved.
    pub(crate) fn io_at(err: io::Error, action: &str, path: &std::path::Path) -> Self {
        let kind = err.kind();
        Self::Io(Arc::new(io::Error::new(
            kind,
            format!("could not {action} {}: {err}", path.display()),
        )))
    }
}

impl fmt::Display for ParamFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(s) => write!(f, "Invalid Argument: {s}"),
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Format(s) => write!(f, "Format Error: {s}"),
            Self::Mismatch(s) => write!(f, "Mismatch Error: {s}"),
            Self::KeyNotFound(key) => write!(f, "Could not find key {key} in the model file"),
        }
    }
}

impl std::error::Error for ParamFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ParamFileError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
