//! The read side: fills or creates handles from records in a file.
//!
//! A [`ModelReader`] only remembers where its data lives. Every retrieval call
//! opens its own stream, scans it once, and drops it on return, including on
//! every error path.

use crate::error::{ParamFileError, Result};
use crate::format::{RecordHeader, RecordKind};
use crate::key::{check_key, normalize_prefix, require_exact_key};
use crate::param::{LookupParameterStorage, ParameterCollection, ParameterStorage, RecordBuffers};
use crate::scan::{MatchStrategy, RecordScanner};
use log::{debug, info};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a reader gets its bytes from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A file, reopened for every call.
    File(PathBuf),
    /// An in-memory copy of a file.
    Memory(Arc<[u8]>),
}

/// A stream the scanner can read lines from and seek in.
pub trait RecordStream: BufRead + Seek {}

impl<T: BufRead + Seek> RecordStream for T {}

type Scanner = RecordScanner<Box<dyn RecordStream>>;

/// Decoded contents of one matched record.
struct LoadedRecord {
    header: RecordHeader,
    values: Vec<f32>,
    grads: Vec<f32>,
}

/// Retrieves records by prefix or exact key.
///
/// Reads may run concurrently against the same file since each call uses its
/// own handle. Reading a file while a writer is appending to it is not supported.
#[derive(Debug, Clone)]
pub struct ModelReader {
    source: DataSource,
}

impl ModelReader {
    /// Creates a reader for `path`. The file is not opened until a retrieval call.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: DataSource::File(path.as_ref().to_path_buf()),
        }
    }

    /// Creates a reader over bytes already in memory.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source: DataSource::Memory(bytes.into()),
        }
    }

    /// The data source this reader scans.
    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub(crate) fn open(&self) -> Result<Scanner> {
        let stream: Box<dyn RecordStream> = match &self.source {
            DataSource::File(path) => {
                let file = File::open(path)
                    .map_err(|e| ParamFileError::io_at(e, "read model from", path))?;
                Box::new(BufReader::new(file))
            }
            DataSource::Memory(bytes) => Box::new(Cursor::new(Arc::clone(bytes))),
        };
        Ok(RecordScanner::new(stream))
    }

    /// Fills every handle of `model` from the file, by position.
    ///
    /// Records are taken in file order; with a non-empty `key` only records whose
    /// name starts with `key/` are considered. The n-th matching parameter record
    /// fills the n-th parameter handle, and likewise for lookup parameters.
    /// Names are not compared. The number of matching records of each kind must
    /// equal the number of handles of that kind.
    ///
    /// Handles filled before a failing record keep their new contents.
    pub fn populate_model<C>(&self, model: &mut C, key: &str) -> Result<()>
    where
        C: ParameterCollection + ?Sized,
    {
        check_key(key)?;
        let prefix = normalize_prefix(key);
        let strategy = MatchStrategy::InOrder { prefix: &prefix };
        let mut scanner = self.open()?;
        let mut param_id = 0;
        let mut lookup_id = 0;

        scanner.scan(&strategy, |header, scanner| {
            match header.kind() {
                Some(RecordKind::Parameter) => {
                    let param = model.parameters_mut().get_mut(param_id).ok_or_else(|| {
                        ParamFileError::Mismatch(format!(
                            "Too many parameters to load in populated model at {}",
                            header.name
                        ))
                    })?;
                    param_id += 1;
                    fill(scanner, header, param)?;
                }
                Some(RecordKind::LookupParameter) => {
                    let param = model
                        .lookup_parameters_mut()
                        .get_mut(lookup_id)
                        .ok_or_else(|| {
                            ParamFileError::Mismatch(format!(
                                "Too many lookup parameters in populated model at {}",
                                header.name
                            ))
                        })?;
                    lookup_id += 1;
                    fill(scanner, header, param)?;
                }
                None => {
                    return Err(ParamFileError::Format(format!(
                        "Bad parameter specification in model: {header}"
                    )))
                }
            }
            Ok(ControlFlow::<()>::Continue(()))
        })?;

        let expected = (model.parameters().len(), model.lookup_parameters().len());
        if (param_id, lookup_id) != expected {
            return Err(ParamFileError::Mismatch(format!(
                "Number of parameter/lookup parameter objects loaded from file \
                 ({param_id}/{lookup_id}) did not match number to be populated ({}/{})",
                expected.0, expected.1
            )));
        }
        info!("populated {param_id} parameters and {lookup_id} lookup parameters");
        Ok(())
    }

    /// Fills one parameter from the record named exactly `key`.
    pub fn populate_param(&self, param: &mut ParameterStorage, key: &str) -> Result<()> {
        require_exact_key(key, "ModelReader.populate_param")?;
        check_key(key)?;
        self.scan_exact(RecordKind::Parameter, key, |header, scanner| {
            fill(scanner, header, &mut *param)
        })
    }

    /// Fills one lookup parameter from the record named exactly `key`.
    pub fn populate_lookup_param(
        &self,
        param: &mut LookupParameterStorage,
        key: &str,
    ) -> Result<()> {
        require_exact_key(key, "ModelReader.populate_lookup_param")?;
        check_key(key)?;
        self.scan_exact(RecordKind::LookupParameter, key, |header, scanner| {
            fill(scanner, header, &mut *param)
        })
    }

    /// Creates a new parameter in `model` from the record named exactly `key`.
    ///
    /// The new handle takes the record's shape and name. `model` is only
    /// modified once the record has been fully decoded.
    pub fn load_param<'m, C>(&self, model: &'m mut C, key: &str) -> Result<&'m mut ParameterStorage>
    where
        C: ParameterCollection + ?Sized,
    {
        require_exact_key(key, "ModelReader.load_param")?;
        check_key(key)?;
        let record = self.scan_exact(RecordKind::Parameter, key, read_record)?;
        let param = model.add_parameters(record.header.shape.clone());
        attach(param, record);
        Ok(param)
    }

    /// Creates a new lookup parameter in `model` from the record named exactly `key`.
    ///
    /// The record's trailing dimension becomes the row count and the leading
    /// dimensions the shape of one row.
    pub fn load_lookup_param<'m, C>(
        &self,
        model: &'m mut C,
        key: &str,
    ) -> Result<&'m mut LookupParameterStorage>
    where
        C: ParameterCollection + ?Sized,
    {
        require_exact_key(key, "ModelReader.load_lookup_param")?;
        check_key(key)?;
        let record = self.scan_exact(RecordKind::LookupParameter, key, read_record)?;
        let (rows, inner_shape) = record.header.shape.split_rows().ok_or_else(|| {
            ParamFileError::Format(format!(
                "Lookup parameter {} has a shape without a row dimension",
                record.header.name
            ))
        })?;
        let param = model.add_lookup_parameters(rows, inner_shape);
        attach(param, record);
        Ok(param)
    }

    fn scan_exact<T, F>(&self, kind: RecordKind, key: &str, mut on_match: F) -> Result<T>
    where
        F: FnMut(&RecordHeader, &mut Scanner) -> Result<T>,
    {
        let strategy = MatchStrategy::ExactName { kind, key };
        let mut scanner = self.open()?;
        scanner
            .scan(&strategy, |header, scanner| {
                on_match(header, scanner).map(ControlFlow::Break)
            })?
            .ok_or_else(|| ParamFileError::KeyNotFound(key.to_owned()))
    }
}

/// Checks the shape, then decodes the payload into `target`.
/// `target` is untouched unless both payload lines decode.
fn fill<B: RecordBuffers>(
    scanner: &mut Scanner,
    header: &RecordHeader,
    target: &mut B,
) -> Result<()> {
    let expected = target.record_shape();
    if expected != header.shape {
        return Err(ParamFileError::Mismatch(format!(
            "Dimensions of {} {} looked up from file ({}) \
             do not match parameters to be populated ({expected})",
            B::KIND.label(),
            header.name,
            header.shape
        )));
    }
    let (values, grads) = scanner.read_payload(header)?;
    target.copy_from(&values, &grads);
    debug!("populated {} from {}", target.name(), header.name);
    Ok(())
}

fn read_record(header: &RecordHeader, scanner: &mut Scanner) -> Result<LoadedRecord> {
    let (values, grads) = scanner.read_payload(header)?;
    Ok(LoadedRecord {
        header: header.clone(),
        values,
        grads,
    })
}

fn attach<B: RecordBuffers>(target: &mut B, record: LoadedRecord) {
    target.copy_from(&record.values, &record.grads);
    target.set_name(record.header.name);
    debug!("loaded new {} {}", B::KIND.label(), target.name());
}
