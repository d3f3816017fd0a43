//! Input validation for registration entry points.
//!
//! Every function returns the canonical form of its input so callers store
//! exactly what was validated.

use shared_types::{categories, AidGroup};

use crate::error::RegistryError;

/// Shortest AID body: 5 bytes (RID).
pub const AID_MIN_HEX_LEN: usize = 10;
/// Longest AID body: 16 bytes.
pub const AID_MAX_HEX_LEN: usize = 32;

/// Prefix AID suffix (`A000000004*`).
pub const PREFIX_SUFFIX: char = '*';
/// Subset AID suffix.
pub const SUBSET_SUFFIX: char = '#';

/// Validates an AID and returns it uppercased.
pub fn validate_aid(aid: &str) -> Result<String, RegistryError> {
    let body = aid
        .strip_suffix(PREFIX_SUFFIX)
        .or_else(|| aid.strip_suffix(SUBSET_SUFFIX))
        .unwrap_or(aid);

    let valid = body.len() % 2 == 0
        && (AID_MIN_HEX_LEN..=AID_MAX_HEX_LEN).contains(&body.len())
        && body.chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(RegistryError::InvalidAid(aid.to_string()));
    }
    Ok(aid.to_ascii_uppercase())
}

pub fn validate_category(category: &str) -> Result<(), RegistryError> {
    if categories::is_valid(category) {
        Ok(())
    } else {
        Err(RegistryError::InvalidCategory(category.to_string()))
    }
}

/// Validates a whole group. Duplicate AIDs collapse to one.
pub fn validate_aid_group(group: &AidGroup) -> Result<AidGroup, RegistryError> {
    validate_category(&group.category)?;
    if group.aids.is_empty() {
        return Err(RegistryError::EmptyAidGroup);
    }
    let mut aids: Vec<String> = Vec::with_capacity(group.aids.len());
    for aid in &group.aids {
        let aid = validate_aid(aid)?;
        if !aids.contains(&aid) {
            aids.push(aid);
        }
    }
    Ok(AidGroup {
        category: group.category.clone(),
        aids,
    })
}

/// Validates a secure-element name. Bare `eSE`/`SIM` mean the first one.
pub fn validate_secure_element(se: &str) -> Result<String, RegistryError> {
    let suffix = se
        .strip_prefix("eSE")
        .or_else(|| se.strip_prefix("SIM"))
        .ok_or_else(|| RegistryError::InvalidSecureElement(se.to_string()))?;

    if suffix.is_empty() {
        return Ok(format!("{se}1"));
    }
    if suffix.chars().all(|c| c.is_ascii_digit()) {
        Ok(se.to_string())
    } else {
        Err(RegistryError::InvalidSecureElement(se.to_string()))
    }
}
