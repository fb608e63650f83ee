//! Low-level sequential writing.
//!
//! Every record is appended in order through one [`SeqWriter`], which tracks
//! how many bytes it has written so callers can report record offsets.

use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// An append-only writer that tracks the current offset.
///
/// Offsets are relative to where this writer started, which in append mode is
/// the end of the pre-existing file content.
#[derive(Debug)]
pub struct SeqWriter<W: Write> {
    writer: W,
    current_offset: u64,
}

impl SeqWriter<BufWriter<File>> {
    /// Opens `path` for writing, truncating it unless `append` is set.
    /// The file is created if it does not exist.
    pub fn open(path: &Path, append: bool, buffer_size: usize) -> std::io::Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options.open(path)?;
        Ok(Self::new(BufWriter::with_capacity(buffer_size, file)))
    }
}

impl<W: Write> SeqWriter<W> {
    /// Wraps an arbitrary sink.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            current_offset: 0,
        }
    }

    /// Writes a complete buffer. Returns the offset where the write started.
    pub fn write_all(&mut self, buffer: &[u8]) -> Result<u64> {
        let start_offset = self.current_offset;
        self.writer.write_all(buffer)?;
        self.current_offset += buffer.len() as u64;
        Ok(start_offset)
    }

    /// Flushes buffered bytes to the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Bytes written so far.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Returns the underlying sink. Buffered data is not flushed first.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
