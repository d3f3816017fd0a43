//! Command APDU inspection.
//!
//! ```text
//! SELECT by name:  CLA=00 INS=A4 P1=04 P2 Lc AID[Lc] (Le)
//! ```

use crate::error::SelectError;

/// `6A82`: file or application not found.
pub const SW_FILE_NOT_FOUND: [u8; 2] = [0x6A, 0x82];
/// `6F00`: no precise diagnosis.
pub const SW_UNKNOWN_ERROR: [u8; 2] = [0x6F, 0x00];

const SELECT_HEADER_LEN: usize = 5;
const MIN_AID_LEN: usize = 5;
const MAX_AID_LEN: usize = 16;

/// The AID of a SELECT-by-name command, as uppercase hex.
///
/// Returns `None` for any other command and for SELECTs whose AID length is
/// outside 5..=16 bytes or exceeds the APDU.
#[must_use]
pub fn select_aid(apdu: &[u8]) -> Option<String> {
    if apdu.len() < SELECT_HEADER_LEN + MIN_AID_LEN {
        return None;
    }
    if apdu[0] != 0x00 || apdu[1] != 0xA4 || apdu[2] != 0x04 {
        return None;
    }
    let len = usize::from(apdu[4]);
    if !(MIN_AID_LEN..=MAX_AID_LEN).contains(&len) || apdu.len() < SELECT_HEADER_LEN + len {
        return None;
    }
    Some(hex::encode_upper(
        &apdu[SELECT_HEADER_LEN..SELECT_HEADER_LEN + len],
    ))
}

/// Builds a SELECT-by-name APDU for `aid_hex`. The AID must be 5..=16
/// bytes, the same range `select_aid` accepts.
pub fn build_select(aid_hex: &str) -> Result<Vec<u8>, SelectError> {
    let aid = hex::decode(aid_hex)?;
    if !(MIN_AID_LEN..=MAX_AID_LEN).contains(&aid.len()) {
        return Err(SelectError::AidLength(aid.len()));
    }
    let lc = u8::try_from(aid.len()).map_err(|_| SelectError::AidLength(aid.len()))?;
    let mut apdu = Vec::with_capacity(SELECT_HEADER_LEN + aid.len() + 1);
    apdu.extend_from_slice(&[0x00, 0xA4, 0x04, 0x00, lc]);
    apdu.extend_from_slice(&aid);
    apdu.push(0x00);
    Ok(apdu)
}
