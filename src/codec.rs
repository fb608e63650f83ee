//! Text codec for flat float sequences.
//!
//! One sequence is one line of space-separated decimal values. Values are
//! written in scientific notation with [`FLOAT32_SIGNIFICANT_DIGITS`] significant
//! digits, which is enough for every finite `f32` to parse back to the same bits.
//!
//! [`FLOAT32_SIGNIFICANT_DIGITS`]: crate::constants::FLOAT32_SIGNIFICANT_DIGITS

use crate::constants::FLOAT32_SIGNIFICANT_DIGITS;
use crate::error::{ParamFileError, Result};
use std::fmt::Write;

/// Appends `values` to `out` as one space-separated line, without the newline.
pub fn encode_floats_into(values: &[f32], out: &mut String) {
    let frac_digits = FLOAT32_SIGNIFICANT_DIGITS - 1;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // Writing into a String cannot fail.
        let _ = write!(out, "{v:.frac_digits$e}");
    }
}

/// Encodes `values` as one space-separated line, without the newline.
pub fn encode_floats(values: &[f32]) -> String {
    let mut out = String::with_capacity(values.len() * (FLOAT32_SIGNIFICANT_DIGITS + 8));
    encode_floats_into(values, &mut out);
    out
}

/// Decodes one line produced by [`encode_floats`].
///
/// Fails with [`ParamFileError::Format`] on an unparsable token or when the
/// number of values differs from `expected_len`.
pub fn decode_floats(line: &str, expected_len: usize) -> Result<Vec<f32>> {
    // Every value takes at least two bytes of the line, separator included.
    let mut values = Vec::with_capacity(expected_len.min(line.len() / 2 + 1));
    for tok in line.split_ascii_whitespace() {
        let v = tok
            .parse::<f32>()
            .map_err(|e| ParamFileError::Format(format!("Bad float value '{tok}': {e}")))?;
        values.push(v);
    }
    if values.len() != expected_len {
        return Err(ParamFileError::Format(format!(
            "Expected {expected_len} values in payload line, found {}",
            values.len()
        )));
    }
    Ok(values)
}
