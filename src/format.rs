//! Defines the record framing of paramfile files.
//!
//! A file is a plain concatenation of records. Each record is one header line
//! followed by a payload of exactly `byte_count` bytes:
//!
//! ```text
//! #Parameter# /layer1/W {3,4} 245
//! <12 values>\n
//! <12 gradients>\n
//! ```
//!
//! Because the header carries the payload length, a reader can seek past a
//! record it is not interested in without touching the payload.

use crate::codec::{decode_floats, encode_floats_into};
use crate::error::{ParamFileError, Result};
use crate::shape::Shape;
use serde::Serialize;
use std::fmt;

/// The two kinds of record a file can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    /// A dense parameter buffer.
    Parameter,
    /// A lookup table: `rows` inner buffers stored back to back.
    LookupParameter,
}

impl RecordKind {
    /// The tag written as the first header field.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Parameter => "#Parameter#",
            Self::LookupParameter => "#LookupParameter#",
        }
    }

    /// Human-readable name used in messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Parameter => "parameter",
            Self::LookupParameter => "lookup parameter",
        }
    }

    /// Inverse of [`tag`](Self::tag). Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "#Parameter#" => Some(Self::Parameter),
            "#LookupParameter#" => Some(Self::LookupParameter),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A parsed header line.
///
/// The tag is kept verbatim: whether an unknown tag is an error depends on
/// whether the reader wanted the record at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// The raw tag field.
    pub tag: String,
    /// The record key.
    pub name: String,
    /// Declared shape of both payload buffers.
    pub shape: Shape,
    /// Exact byte length of the payload that follows the header line.
    pub byte_count: u64,
}

impl RecordHeader {
    /// Builds a header for a known record kind.
    pub fn new(kind: RecordKind, name: impl Into<String>, shape: Shape, byte_count: u64) -> Self {
        Self {
            tag: kind.tag().to_owned(),
            name: name.into(),
            shape,
            byte_count,
        }
    }

    /// The record kind, or `None` for an unrecognised tag.
    pub fn kind(&self) -> Option<RecordKind> {
        RecordKind::from_tag(&self.tag)
    }

    /// Parses one header line (without its trailing newline).
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_ascii_whitespace().collect();
        let [tag, name, shape, byte_count] = fields.as_slice() else {
            return Err(ParamFileError::Format(format!(
                "Bad parameter specification in model: {line}"
            )));
        };
        let shape: Shape = shape.parse()?;
        let byte_count = byte_count.parse::<u64>().map_err(|e| {
            ParamFileError::Format(format!("Bad byte count in header '{line}': {e}"))
        })?;
        Ok(Self {
            tag: (*tag).to_owned(),
            name: (*name).to_owned(),
            shape,
            byte_count,
        })
    }
}

impl fmt::Display for RecordHeader {
    /// Formats the header line without its trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.tag, self.name, self.shape, self.byte_count)
    }
}

/// Serializes the payload: values line then gradients line, each newline-terminated.
/// The returned string's byte length is the header's `byte_count`.
pub fn encode_payload(values: &[f32], grads: &[f32]) -> String {
    let mut buffer = String::new();
    encode_floats_into(values, &mut buffer);
    buffer.push('\n');
    encode_floats_into(grads, &mut buffer);
    buffer.push('\n');
    buffer
}

/// Decodes a complete payload into `(values, gradients)`, each of `len` elements.
///
/// `payload` must be exactly the `byte_count` bytes that followed the header.
pub fn decode_payload(payload: &[u8], len: usize) -> Result<(Vec<f32>, Vec<f32>)> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| ParamFileError::Format(format!("Payload is not valid UTF-8: {e}")))?;
    let body = text.strip_suffix('\n').ok_or_else(|| {
        ParamFileError::Format("Payload does not end with a newline".into())
    })?;
    let Some((values_line, grads_line)) = body.split_once('\n') else {
        return Err(ParamFileError::Format(
            "Payload must hold exactly two lines".into(),
        ));
    };
    if grads_line.contains('\n') {
        return Err(ParamFileError::Format(
            "Payload must hold exactly two lines".into(),
        ));
    }
    let values = decode_floats(values_line, len)?;
    let grads = decode_floats(grads_line, len)?;
    Ok((values, grads))
}
