//! # paramfile
//!
//! A streaming, line-oriented text format for saving and restoring named sets of
//! numeric parameter buffers, each paired with a gradient buffer of the same shape.
//!
//! ## Overview
//!
//! A whole parameter collection is written to one file. It can later be loaded
//! back in full, restricted to a namespace prefix, or one entry at a time by exact
//! name, without parsing the records that are not wanted.
//!
//! ### Key Features
//!
//! *   **Self-describing records:** every record starts with a header line holding
//!     its kind, name, shape and payload length.
//! *   **Skip without parse:** unwanted records are passed over with a single seek,
//!     so their cost is one header line no matter how large the payload is.
//! *   **Path-like keys:** names look like `/encoder/W`, so a prefix selects a
//!     whole namespace subtree.
//! *   **Exact float round trip:** values are written with enough decimal digits
//!     to reload every `f32` bit for bit.
//!
//! ## File Format
//!
//! ```text
//! #Parameter# /W {3,4} 312
//! <12 space-separated values>
//! <12 space-separated gradients>
//! #LookupParameter# /E {8,100} 20800
//! <800 values>
//! <800 gradients>
//! ```
//!
//! The last header field is the exact byte length of the two payload lines,
//! newlines included. A file is just a concatenation of records, so appending
//! to it is always safe.
//!
//! ## Core Concepts
//!
//! ### Collections and handles
//!
//! A [`ParameterCollection`] owns ordered parameters and lookup parameters and a
//! `fullname` namespace. [`Model`] is the in-memory implementation.
//!
//! ### Writer
//!
//! [`ModelWriter`] holds one output stream for its lifetime and can save a whole
//! collection (optionally re-rooted under another prefix) or single handles.
//!
//! ### Reader
//!
//! [`ModelReader`] opens a fresh stream per call and offers:
//!
//! - [`populate_model`](ModelReader::populate_model): fill every handle of a
//!   collection by position, optionally under a prefix.
//! - [`populate_param`](ModelReader::populate_param) /
//!   [`populate_lookup_param`](ModelReader::populate_lookup_param): fill one
//!   existing handle from the record with exactly its key.
//! - [`load_param`](ModelReader::load_param) /
//!   [`load_lookup_param`](ModelReader::load_lookup_param): create a new handle
//!   from a record and register it with a collection.
//!
//! ## Usage
//!
//! ```rust
//! use paramfile::{Model, ModelReader, ModelWriter, ParameterCollection, Shape};
//!
//! let mut model = Model::new();
//! model.add_parameters(Shape::from([2, 2])).values_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
//!
//! let mut writer = ModelWriter::from_writer(Vec::new());
//! writer.save_model(&model, "")?;
//! let bytes = writer.into_inner()?;
//!
//! let mut restored = Model::new();
//! restored.add_parameters(Shape::from([2, 2]));
//! ModelReader::from_bytes(bytes).populate_model(&mut restored, "")?;
//! assert_eq!(restored.parameters()[0].values(), &[1.0, 2.0, 3.0, 4.0]);
//! # Ok::<(), paramfile::ParamFileError>(())
//! ```
//!
//! ## Safety and Error Handling
//!
//! * **No unsafe code.**
//! * **No Panics:** no `unwrap()` or `panic!()` in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** all failures correspond to a [`ParamFileError`].
//! * **No rollback:** a multi-record populate that fails part way leaves the
//!   handles it already filled modified.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod codec;
pub mod error;
pub mod format;
pub mod inspector;
pub mod key;
pub mod param;
pub mod reader;
pub mod scan;
pub mod shape;
pub mod writer;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod io;

// --- RE-EXPORTS ---

pub use error::{ParamFileError, Result};
pub use format::{RecordHeader, RecordKind};
pub use inspector::{FileReport, ModelInspector, RecordInfo};
pub use key::{valid_key, valid_pc_key};
pub use param::{LookupParameterStorage, Model, ParameterCollection, ParameterStorage};
pub use reader::{DataSource, ModelReader};
pub use shape::Shape;
pub use writer::{ModelWriter, WriterOptions};

/// Constants used throughout the library.
pub mod constants {
    /// The default buffer size for file writes.
    pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

    /// Significant decimal digits used when writing an `f32`.
    /// Nine digits round-trip every finite `f32` exactly.
    pub const FLOAT32_SIGNIFICANT_DIGITS: usize = 9;
}
