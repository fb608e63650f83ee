//! Tools for inspecting the record layout of a paramfile file.
//! Useful for checking what a checkpoint contains before loading it.

use crate::error::Result;
use crate::reader::{DataSource, ModelReader};
use crate::shape::Shape;
use serde::Serialize;
use std::path::Path;

/// A structural report of a file: one entry per record, in file order.
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// Total size of the data in bytes.
    pub file_size: u64,
    /// Every record header found.
    pub records: Vec<RecordInfo>,
}

/// Header-level metadata of one record.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Offset of the header line.
    pub offset: u64,
    /// The raw record tag.
    pub tag: String,
    /// Record key.
    pub name: String,
    /// Declared shape.
    pub shape: Shape,
    /// Declared payload length.
    pub payload_bytes: u64,
}

/// The paramfile inspector.
///
/// Walks headers with skip-seeks only; payloads are never read.
#[derive(Debug)]
pub struct ModelInspector;

impl ModelInspector {
    /// Analyzes a file on disk.
    pub fn inspect<P: AsRef<Path>>(path: P) -> Result<FileReport> {
        Self::inspect_reader(&ModelReader::new(path))
    }

    /// Analyzes an in-memory file.
    pub fn inspect_bytes(bytes: impl Into<std::sync::Arc<[u8]>>) -> Result<FileReport> {
        Self::inspect_reader(&ModelReader::from_bytes(bytes))
    }

    fn inspect_reader(reader: &ModelReader) -> Result<FileReport> {
        let mut scanner = reader.open()?;
        let mut records = Vec::new();
        loop {
            let offset = scanner.position()?;
            let Some(header) = scanner.next_header()? else {
                break;
            };
            scanner.skip(&header)?;
            records.push(RecordInfo {
                offset,
                tag: header.tag,
                name: header.name,
                shape: header.shape,
                payload_bytes: header.byte_count,
            });
        }

        let file_size = match reader.source() {
            DataSource::File(path) => std::fs::metadata(path)?.len(),
            DataSource::Memory(bytes) => bytes.len() as u64,
        };
        Ok(FileReport { file_size, records })
    }
}

impl std::fmt::Display for FileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== PARAMFILE INSPECTOR REPORT ===")?;
        writeln!(f, "File Size: {}b | Records: {}", self.file_size, self.records.len())?;
        for (i, rec) in self.records.iter().enumerate() {
            let connector = if i + 1 == self.records.len() { "└── " } else { "├── " };
            writeln!(
                f,
                "{connector}@{} {} {} {} | Payload: {}b",
                rec.offset, rec.tag, rec.name, rec.shape, rec.payload_bytes
            )?;
        }
        Ok(())
    }
}
