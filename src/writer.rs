//! The write side: serializes collections and single handles as framed records.

use crate::constants::DEFAULT_BUFFER_SIZE;
use crate::error::{ParamFileError, Result};
use crate::format::{encode_payload, RecordHeader};
use crate::io::SeqWriter;
use crate::key::{check_key, check_pc_key, normalize_prefix};
use crate::param::{LookupParameterStorage, ParameterCollection, ParameterStorage, RecordBuffers};
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Construction options for a file-backed [`ModelWriter`].
///
/// ```rust,no_run
/// use paramfile::WriterOptions;
///
/// let mut writer = WriterOptions::new().append(true).open("model.txt")?;
/// # Ok::<(), paramfile::ParamFileError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    append: bool,
    buffer_size: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            append: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl WriterOptions {
    /// Truncating writer with the default buffer size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to an existing file instead of truncating it.
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Capacity of the write buffer in front of the file.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Opens `path` and returns a writer that owns it until dropped.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<ModelWriter> {
        let path = path.as_ref();
        let inner = SeqWriter::open(path, self.append, self.buffer_size)
            .map_err(|e| ParamFileError::io_at(e, "write model to", path))?;
        debug!(
            "opened {} for writing (append: {})",
            path.display(),
            self.append
        );
        Ok(ModelWriter { inner })
    }
}

/// Writes records to one output stream held for the writer's whole lifetime.
///
/// Every `save_*` call appends its records in order and flushes before returning,
/// so a later writer or reader sees them complete. Not meant to be shared between
/// threads without external serialization.
#[derive(Debug)]
pub struct ModelWriter<W: Write = BufWriter<File>> {
    inner: SeqWriter<W>,
}

impl ModelWriter {
    /// Creates (or truncates) `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        WriterOptions::new().open(path)
    }

    /// Opens `path` for appending, creating it if needed.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        WriterOptions::new().append(true).open(path)
    }
}

impl<W: Write> ModelWriter<W> {
    /// Writes records into an arbitrary sink, e.g. a `Vec<u8>`.
    pub fn from_writer(writer: W) -> Self {
        Self {
            inner: SeqWriter::new(writer),
        }
    }

    /// Saves every parameter, then every lookup parameter, of `model`.
    ///
    /// With an empty `key` each record is keyed by its handle's stored name.
    /// Otherwise `key` (which must start with `/`) replaces the collection's
    /// `fullname` prefix, re-rooting the whole collection under `key`.
    pub fn save_model<C>(&mut self, model: &C, key: &str) -> Result<()>
    where
        C: ParameterCollection + ?Sized,
    {
        check_pc_key(key)?;
        let prefix = normalize_prefix(key);
        let strip_size = model.fullname().len();

        let param_keys = model
            .parameters()
            .iter()
            .map(|p| rerooted_key(&prefix, p.name(), strip_size))
            .collect::<Result<Vec<_>>>()?;
        let lookup_keys = model
            .lookup_parameters()
            .iter()
            .map(|p| rerooted_key(&prefix, p.name(), strip_size))
            .collect::<Result<Vec<_>>>()?;

        for (p, k) in model.parameters().iter().zip(&param_keys) {
            self.write_record(p, k)?;
        }
        for (p, k) in model.lookup_parameters().iter().zip(&lookup_keys) {
            self.write_record(p, k)?;
        }
        self.inner.flush()
    }

    /// Saves one parameter under `key`, or under its own name if `key` is empty.
    pub fn save_param(&mut self, param: &ParameterStorage, key: &str) -> Result<()> {
        check_key(key)?;
        let name = effective_name(key, param.name())?;
        self.write_record(param, name)?;
        self.inner.flush()
    }

    /// Saves one lookup parameter under `key`, or under its own name if `key` is empty.
    pub fn save_lookup_param(&mut self, param: &LookupParameterStorage, key: &str) -> Result<()> {
        check_key(key)?;
        let name = effective_name(key, param.name())?;
        self.write_record(param, name)?;
        self.inner.flush()
    }

    /// Flushes buffered bytes to the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    /// Bytes written through this writer so far.
    pub fn offset(&self) -> u64 {
        self.inner.current_offset()
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner.into_inner())
    }

    fn write_record<B: RecordBuffers>(&mut self, param: &B, name: &str) -> Result<()> {
        let payload = encode_payload(param.values(), param.grads());
        let header = RecordHeader::new(B::KIND, name, param.record_shape(), payload.len() as u64);
        let offset = self.inner.write_all(format!("{header}\n").as_bytes())?;
        self.inner.write_all(payload.as_bytes())?;
        debug!(
            "wrote {} {} {} ({} payload bytes) at offset {offset}",
            B::KIND.label(),
            header.name,
            header.shape,
            header.byte_count
        );
        Ok(())
    }
}

fn effective_name<'a>(key: &'a str, stored: &'a str) -> Result<&'a str> {
    let name = if key.is_empty() { stored } else { key };
    if name.is_empty() {
        return Err(ParamFileError::InvalidArgument(
            "Cannot save a parameter with an empty name and no key".into(),
        ));
    }
    check_key(name)?;
    Ok(name)
}

fn rerooted_key(prefix: &str, stored: &str, strip_size: usize) -> Result<String> {
    if prefix.is_empty() {
        return effective_name("", stored).map(str::to_owned);
    }
    let rest = stored.get(strip_size..).ok_or_else(|| {
        ParamFileError::InvalidArgument(format!(
            "Parameter name {stored} is shorter than its collection's namespace"
        ))
    })?;
    let key = format!("{prefix}{rest}");
    check_key(&key)?;
    Ok(key)
}
