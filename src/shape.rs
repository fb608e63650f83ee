//! The shape descriptor attached to every buffer and record.
//!
//! Textual form is a brace-delimited, comma-separated dimension list with no
//! whitespace, e.g. `{3,4}`, so it occupies exactly one header field.

use crate::error::{ParamFileError, Result};
use serde::Serialize;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

/// Ordered list of buffer dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a shape from its dimensions.
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self { dims: dims.into() }
    }

    /// The dimensions, outermost first.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements, saturating at `usize::MAX`.
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    /// Total number of elements, or `None` if the product overflows `usize`.
    pub fn checked_size(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns this shape with `rows` appended as the trailing dimension.
    ///
    /// This is how a lookup parameter's `rows × inner` layout is flattened on disk.
    pub fn with_rows(&self, rows: usize) -> Self {
        let mut dims = self.dims.clone();
        dims.push(rows);
        Self { dims }
    }

    /// Removes and returns the trailing dimension.
    pub fn pop_last(&mut self) -> Option<usize> {
        self.dims.pop()
    }

    /// Splits a flattened lookup shape into `(rows, inner)`.
    /// Returns `None` for a rank-0 shape.
    pub fn split_rows(&self) -> Option<(usize, Shape)> {
        let mut inner = self.clone();
        let rows = inner.pop_last()?;
        Some((rows, inner))
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self { dims }
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self { dims: dims.to_vec() }
    }
}

impl Index<usize> for Shape {
    type Output = usize;

    fn index(&self, index: usize) -> &usize {
        &self.dims[index]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{d}")?;
        }
        f.write_str("}")
    }
}

impl FromStr for Shape {
    type Err = ParamFileError;

    fn from_str(s: &str) -> Result<Self> {
        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| ParamFileError::Format(format!("Bad shape descriptor: {s}")))?;
        if inner.is_empty() {
            return Ok(Self::default());
        }
        let dims = inner
            .split(',')
            .map(|tok| match tok.parse::<usize>() {
                Ok(d) if d > 0 => Ok(d),
                _ => Err(ParamFileError::Format(format!(
                    "Bad dimension '{tok}' in shape descriptor {s}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        let shape = Self { dims };
        if shape.checked_size().is_none() {
            return Err(ParamFileError::Format(format!(
                "Element count of shape {s} overflows"
            )));
        }
        Ok(shape)
    }
}
