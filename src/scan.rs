//! The linear scan shared by every read mode.
//!
//! The scanner reads one header line at a time. A record the current
//! [`MatchStrategy`] does not want is skipped by seeking `byte_count` bytes
//! forward, so skipping costs one header line regardless of payload size and
//! never looks at the payload bytes.

use crate::error::{ParamFileError, Result};
use crate::format::{decode_payload, RecordHeader, RecordKind};
use log::trace;
use std::io::{BufRead, ErrorKind, Read, Seek, SeekFrom};
use std::ops::ControlFlow;

/// Which records a scan wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy<'k> {
    /// Every record whose name starts with `prefix` (every record when empty).
    /// The caller pairs matches with handles by encounter order.
    InOrder {
        /// Normalized prefix, ending in `/` unless empty.
        prefix: &'k str,
    },
    /// Only records of `kind` whose name equals `key`.
    ExactName {
        /// Required record kind.
        kind: RecordKind,
        /// Required record name.
        key: &'k str,
    },
}

impl MatchStrategy<'_> {
    /// Returns true if the record should be handed to the caller instead of skipped.
    pub fn accepts(&self, header: &RecordHeader) -> bool {
        match *self {
            Self::InOrder { prefix } => prefix.is_empty() || header.name.starts_with(prefix),
            Self::ExactName { kind, key } => header.kind() == Some(kind) && header.name == key,
        }
    }
}

/// Cursor over the records of one stream.
#[derive(Debug)]
pub struct RecordScanner<R> {
    stream: R,
    line: String,
}

impl<R: BufRead + Seek> RecordScanner<R> {
    /// Starts scanning at the stream's current position.
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            line: String::new(),
        }
    }

    /// Current byte offset in the stream.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.stream.stream_position()?)
    }

    /// Reads the next header line. Returns `None` at end of stream.
    ///
    /// After a header the stream sits at the start of its payload; the caller
    /// must follow with exactly one of [`skip`](Self::skip) or
    /// [`read_payload`](Self::read_payload).
    pub fn next_header(&mut self) -> Result<Option<RecordHeader>> {
        self.line.clear();
        let read = self.stream.read_line(&mut self.line).map_err(|e| {
            if e.kind() == ErrorKind::InvalidData {
                ParamFileError::Format(format!("Header line is not valid UTF-8: {e}"))
            } else {
                e.into()
            }
        })?;
        if read == 0 {
            return Ok(None);
        }
        let line = self.line.strip_suffix('\n').unwrap_or(&self.line);
        RecordHeader::parse(line).map(Some)
    }

    /// Seeks past the payload of `header` without reading it.
    pub fn skip(&mut self, header: &RecordHeader) -> Result<()> {
        let distance = i64::try_from(header.byte_count).map_err(|_| {
            ParamFileError::Format(format!(
                "Byte count {} of {} is too large",
                header.byte_count, header.name
            ))
        })?;
        self.stream.seek(SeekFrom::Current(distance))?;
        trace!("skipped {} ({} bytes)", header.name, header.byte_count);
        Ok(())
    }

    /// Reads and decodes the payload of `header` into `(values, gradients)`.
    pub fn read_payload(&mut self, header: &RecordHeader) -> Result<(Vec<f32>, Vec<f32>)> {
        let len = header.shape.checked_size().ok_or_else(|| {
            ParamFileError::Format(format!("Element count of {} overflows", header.name))
        })?;
        // Two lines of `len` values, each value at least one digit plus a separator.
        let min_bytes = (len as u64).saturating_mul(4);
        if header.byte_count < min_bytes {
            return Err(ParamFileError::Format(format!(
                "Byte count {} of {} is too small for shape {} (needs at least {min_bytes})",
                header.byte_count, header.name, header.shape
            )));
        }
        let mut payload = Vec::new();
        (&mut self.stream)
            .take(header.byte_count)
            .read_to_end(&mut payload)?;
        if (payload.len() as u64) < header.byte_count {
            return Err(ParamFileError::Format(format!(
                "Payload of {} is truncated: expected {} bytes, found {}",
                header.name,
                header.byte_count,
                payload.len()
            )));
        }
        decode_payload(&payload, len).map_err(|e| match e {
            ParamFileError::Format(msg) => {
                ParamFileError::Format(format!("In record {}: {msg}", header.name))
            }
            other => other,
        })
    }

    /// Walks the remaining records, skipping those `strategy` rejects and handing
    /// the rest to `on_match`, which must consume the payload.
    ///
    /// Stops at the first `Break` and returns its value, or `None` at end of stream.
    pub fn scan<T, F>(&mut self, strategy: &MatchStrategy<'_>, mut on_match: F) -> Result<Option<T>>
    where
        F: FnMut(&RecordHeader, &mut Self) -> Result<ControlFlow<T>>,
    {
        while let Some(header) = self.next_header()? {
            if !strategy.accepts(&header) {
                self.skip(&header)?;
                continue;
            }
            if let ControlFlow::Break(value) = on_match(&header, self)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}
