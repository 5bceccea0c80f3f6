//! Conversion between processing text (`str`) and the wire encoding (UTF-16LE).

use crate::error::{constants, ProtocolError, Result};

/// Encode text as UTF-16LE bytes.
pub fn to_wire(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Decode UTF-16LE bytes into a `String`.
pub fn from_wire(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(ProtocolError::Encoding(constants::ERR_ODD_UTF16_LENGTH.into()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|_| ProtocolError::Encoding(constants::ERR_INVALID_UTF16.into()))
}

/// Byte offset just past the first `\n` code unit, if any.
///
/// Only even offsets are considered so a `0x0A` byte inside another code unit
/// never matches.
pub fn first_line_end(bytes: &[u8]) -> Option<usize> {
    bytes
        .chunks_exact(2)
        .position(|pair| pair == [b'\n', 0])
        .map(|unit| (unit + 1) * 2)
}
