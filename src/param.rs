//! Parameter handles and the collection abstraction the reader and writer work against.
//!
//! A handle owns a values buffer and a gradients buffer of identical shape.
//! A collection owns two ordered sequences of handles. Order matters: a full
//! populate matches records to handles by position, not by name.

use crate::error::{ParamFileError, Result};
use crate::format::RecordKind;
use crate::key::{check_key, check_pc_key};
use crate::shape::Shape;

/// A dense parameter: one buffer of `shape` plus its gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStorage {
    name: String,
    shape: Shape,
    values: Vec<f32>,
    grads: Vec<f32>,
}

impl ParameterStorage {
    /// Creates a zero-filled parameter.
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        let len = shape.size();
        Self {
            name: name.into(),
            shape,
            values: vec![0.0; len],
            grads: vec![0.0; len],
        }
    }

    /// The stored name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the stored name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The buffer shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Flat values buffer.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Mutable flat values buffer.
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Flat gradients buffer.
    pub fn grads(&self) -> &[f32] {
        &self.grads
    }

    /// Mutable flat gradients buffer.
    pub fn grads_mut(&mut self) -> &mut [f32] {
        &mut self.grads
    }
}

/// A lookup parameter: `rows` inner buffers of `inner_shape`, stored back to back.
///
/// On disk its shape is flattened to the inner dimensions followed by the row count.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupParameterStorage {
    name: String,
    rows: usize,
    inner_shape: Shape,
    values: Vec<f32>,
    grads: Vec<f32>,
}

impl LookupParameterStorage {
    /// Creates a zero-filled lookup table of `rows` entries.
    pub fn new(name: impl Into<String>, rows: usize, inner_shape: Shape) -> Self {
        let len = rows * inner_shape.size();
        Self {
            name: name.into(),
            rows,
            inner_shape,
            values: vec![0.0; len],
            grads: vec![0.0; len],
        }
    }

    /// The stored name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the stored name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Shape of a single row.
    pub fn inner_shape(&self) -> &Shape {
        &self.inner_shape
    }

    /// Flattened shape: inner dimensions then the row count.
    pub fn all_shape(&self) -> Shape {
        self.inner_shape.with_rows(self.rows)
    }

    /// Values of every row, concatenated.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Mutable values of every row, concatenated.
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Gradients of every row, concatenated.
    pub fn grads(&self) -> &[f32] {
        &self.grads
    }

    /// Mutable gradients of every row, concatenated.
    pub fn grads_mut(&mut self) -> &mut [f32] {
        &mut self.grads
    }

    /// Values of row `index`, or `None` if out of range.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let range = self.row_range(index)?;
        self.values.get(range)
    }

    /// Mutable values of row `index`, or `None` if out of range.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        let range = self.row_range(index)?;
        self.values.get_mut(range)
    }

    fn row_range(&self, index: usize) -> Option<std::ops::Range<usize>> {
        let width = self.inner_shape.size();
        let start = index.checked_mul(width)?;
        Some(start..start.checked_add(width)?)
    }
}

/// Uniform view over both handle kinds, used by record emission and population.
pub(crate) trait RecordBuffers {
    const KIND: RecordKind;

    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    /// Shape as written in the record header.
    fn record_shape(&self) -> Shape;
    fn values(&self) -> &[f32];
    fn grads(&self) -> &[f32];
    /// Copies decoded buffers in. Both slices have `record_shape().size()` elements.
    fn copy_from(&mut self, values: &[f32], grads: &[f32]);
}

impl RecordBuffers for ParameterStorage {
    const KIND: RecordKind = RecordKind::Parameter;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn record_shape(&self) -> Shape {
        self.shape.clone()
    }

    fn values(&self) -> &[f32] {
        &self.values
    }

    fn grads(&self) -> &[f32] {
        &self.grads
    }

    fn copy_from(&mut self, values: &[f32], grads: &[f32]) {
        self.values.copy_from_slice(values);
        self.grads.copy_from_slice(grads);
    }
}

impl RecordBuffers for LookupParameterStorage {
    const KIND: RecordKind = RecordKind::LookupParameter;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn record_shape(&self) -> Shape {
        self.all_shape()
    }

    fn values(&self) -> &[f32] {
        &self.values
    }

    fn grads(&self) -> &[f32] {
        &self.grads
    }

    fn copy_from(&mut self, values: &[f32], grads: &[f32]) {
        self.values.copy_from_slice(values);
        self.grads.copy_from_slice(grads);
    }
}

/// An ordered container of parameter and lookup-parameter handles.
///
/// The reader only appends (through the `add_*` methods) or overwrites buffers;
/// it never removes or reorders handles.
pub trait ParameterCollection {
    /// Namespace root of this collection, e.g. `/` or `/encoder/`.
    /// Every handle name is expected to start with it.
    fn fullname(&self) -> &str;

    /// Parameters in registration order.
    fn parameters(&self) -> &[ParameterStorage];

    /// Mutable parameters in registration order.
    fn parameters_mut(&mut self) -> &mut [ParameterStorage];

    /// Lookup parameters in registration order.
    fn lookup_parameters(&self) -> &[LookupParameterStorage];

    /// Mutable lookup parameters in registration order.
    fn lookup_parameters_mut(&mut self) -> &mut [LookupParameterStorage];

    /// Allocates a zero-filled parameter of `shape`, registers it last, and returns it.
    fn add_parameters(&mut self, shape: Shape) -> &mut ParameterStorage;

    /// Allocates a zero-filled lookup table, registers it last, and returns it.
    fn add_lookup_parameters(
        &mut self,
        rows: usize,
        inner_shape: Shape,
    ) -> &mut LookupParameterStorage;
}

/// The in-memory [`ParameterCollection`].
///
/// Unnamed handles are called `<fullname>_<n>`, with one counter shared by both kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    fullname: String,
    params: Vec<ParameterStorage>,
    lookup_params: Vec<LookupParameterStorage>,
    next_id: usize,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Creates an empty collection rooted at `/`.
    pub fn new() -> Self {
        Self {
            fullname: "/".to_owned(),
            params: Vec::new(),
            lookup_params: Vec::new(),
            next_id: 0,
        }
    }

    /// Creates an empty collection rooted at `fullname`.
    ///
    /// `fullname` must start with `/`; a trailing `/` is added if missing.
    pub fn with_fullname(fullname: &str) -> Result<Self> {
        if fullname.is_empty() {
            return Err(ParamFileError::InvalidArgument(
                "Collection name must not be empty".into(),
            ));
        }
        if fullname == "/" {
            return Ok(Self::new());
        }
        check_pc_key(fullname)?;
        let mut model = Self::new();
        model.fullname = crate::key::normalize_prefix(fullname);
        Ok(model)
    }

    /// Creates an empty collection nested under this one's namespace.
    pub fn sub(&self, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains('/') {
            return Err(ParamFileError::InvalidArgument(format!(
                "Sub-collection name must be a single non-empty path segment: {name}"
            )));
        }
        check_key(name)?;
        Self::with_fullname(&format!("{}{name}", self.fullname))
    }

    /// Adds a zero-filled parameter named `<fullname><name>`.
    pub fn add_parameters_named(
        &mut self,
        shape: Shape,
        name: &str,
    ) -> Result<&mut ParameterStorage> {
        let full = self.scoped_name(name)?;
        Ok(push_last(&mut self.params, ParameterStorage::new(full, shape)))
    }

    /// Adds a zero-filled lookup table named `<fullname><name>`.
    pub fn add_lookup_parameters_named(
        &mut self,
        rows: usize,
        inner_shape: Shape,
        name: &str,
    ) -> Result<&mut LookupParameterStorage> {
        let full = self.scoped_name(name)?;
        Ok(push_last(
            &mut self.lookup_params,
            LookupParameterStorage::new(full, rows, inner_shape),
        ))
    }

    fn scoped_name(&self, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(ParamFileError::InvalidArgument(
                "Parameter name must not be empty".into(),
            ));
        }
        check_key(name)?;
        Ok(format!("{}{name}", self.fullname))
    }

    fn auto_name(&mut self) -> String {
        let name = format!("{}_{}", self.fullname, self.next_id);
        self.next_id += 1;
        name
    }
}

impl ParameterCollection for Model {
    fn fullname(&self) -> &str {
        &self.fullname
    }

    fn parameters(&self) -> &[ParameterStorage] {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut [ParameterStorage] {
        &mut self.params
    }

    fn lookup_parameters(&self) -> &[LookupParameterStorage] {
        &self.lookup_params
    }

    fn lookup_parameters_mut(&mut self) -> &mut [LookupParameterStorage] {
        &mut self.lookup_params
    }

    fn add_parameters(&mut self, shape: Shape) -> &mut ParameterStorage {
        let name = self.auto_name();
        push_last(&mut self.params, ParameterStorage::new(name, shape))
    }

    fn add_lookup_parameters(
        &mut self,
        rows: usize,
        inner_shape: Shape,
    ) -> &mut LookupParameterStorage {
        let name = self.auto_name();
        push_last(
            &mut self.lookup_params,
            LookupParameterStorage::new(name, rows, inner_shape),
        )
    }
}

fn push_last<T>(items: &mut Vec<T>, item: T) -> &mut T {
    let idx = items.len();
    items.push(item);
    &mut items[idx]
}
