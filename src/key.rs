//! Key and namespace-path validation.
//!
//! Keys are path-like strings. A space separates header fields and `#` delimits
//! the record tag, so neither may appear in a key. The root path `/` on its own
//! is reserved because it would make every record match a prefix filter.

use crate::error::{ParamFileError, Result};

/// Returns true if `s` may be used as a record key.
///
/// The empty string is valid (it means "use the handle's own name").
///
/// ```rust
/// use paramfile::key::valid_key;
///
/// assert!(valid_key(""));
/// assert!(valid_key("layer1/W"));
/// assert!(!valid_key("/"));
/// assert!(!valid_key("a b"));
/// assert!(!valid_key("a#b"));
/// ```
pub fn valid_key(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if s == "/" {
        return false;
    }
    !s.contains([' ', '#'])
}

/// Returns true if `s` may be used as a collection-scoped key:
/// empty, or starting with `/` and otherwise a [`valid_key`].
pub fn valid_pc_key(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    s.starts_with('/') && valid_key(s)
}

/// Appends a trailing `/` to a non-empty key that lacks one.
/// The empty key stays empty.
pub fn normalize_prefix(key: &str) -> String {
    let mut prefix = key.to_owned();
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

pub(crate) fn check_key(key: &str) -> Result<()> {
    if valid_key(key) {
        Ok(())
    } else {
        Err(ParamFileError::InvalidArgument(format!(
            "Key could not include ' ' or '#': {key}"
        )))
    }
}

pub(crate) fn check_pc_key(key: &str) -> Result<()> {
    if valid_pc_key(key) {
        Ok(())
    } else {
        Err(ParamFileError::InvalidArgument(format!(
            "Key should start with '/' and could not include ' ' or '#': {key}"
        )))
    }
}

pub(crate) fn require_exact_key(key: &str, operation: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ParamFileError::InvalidArgument(format!(
            "{operation}() requires non-empty key"
        )));
    }
    Ok(())
}
