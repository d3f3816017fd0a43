//! Filter normalization.
//!
//! Frame payloads are matched as uppercase hex, so every filter is
//! uppercased before it is stored. Patterns are anchored on both ends:
//! a pattern must account for the whole payload, not a substring of it.

use regex::Regex;

use crate::error::FilterError;

/// Validates an exact filter and returns its canonical (uppercase) form.
pub fn normalize_exact_filter(filter: &str) -> Result<String, FilterError> {
    if filter.is_empty() {
        return Err(FilterError::Empty);
    }
    if filter.len() % 2 != 0 {
        return Err(FilterError::OddLength(filter.to_string()));
    }
    let bytes = hex::decode(filter).map_err(|_| FilterError::InvalidHex(filter.to_string()))?;
    Ok(hex::encode_upper(bytes))
}

/// Canonical (uppercase) form of a pattern filter, validated by compiling it.
pub fn normalize_pattern(pattern: &str) -> Result<String, FilterError> {
    if pattern.is_empty() {
        return Err(FilterError::Empty);
    }
    let upper = pattern.to_ascii_uppercase();
    compile_pattern(&upper)?;
    Ok(upper)
}

/// Compiles a pattern with full-match semantics.
pub fn compile_pattern(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
