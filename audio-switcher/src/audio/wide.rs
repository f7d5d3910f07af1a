//! UTF-8 / UTF-16 conversion for OS call arguments.
//!
//! Device IDs and names cross the binding boundary as UTF-8 and the COM
//! audio interfaces as NUL-terminated UTF-16.

use super::device::AudioError;

/// Encode `s` as NUL-terminated UTF-16.
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decode UTF-16, stopping at the first NUL if there is one.
pub fn from_wide(wide: &[u16]) -> Result<String, AudioError> {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16(&wide[..len]).map_err(|e| AudioError::StringConversion(e.to_string()))
}
