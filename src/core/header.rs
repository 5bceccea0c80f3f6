//! Fixed 9-character frame header.
//!
//! ```text
//! [BodySize(4 hex)] [Sequence(4 hex)] [Flag(1 hex)]
//! ```

use crate::error::{ProtocolError, Result};
use std::fmt::Write;

/// Header length in bytes.
pub const HEADER_LENGTH: usize = 9;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Body length in bytes of the wire encoding.
    pub body_size: u16,
    /// Sequence number of the exchange this frame belongs to.
    pub sequence: u16,
    /// Nonzero when more frames follow for the same logical message.
    pub flag: u8,
}

impl FrameHeader {
    pub fn new(body_size: u16, sequence: u16, flag: u8) -> Self {
        Self {
            body_size,
            sequence,
            flag,
        }
    }

    /// Render the header as its 9 ASCII hex characters.
    ///
    /// Only the low nibble of `flag` fits in the single flag character.
    pub fn encode(&self) -> [u8; HEADER_LENGTH] {
        let mut text = String::with_capacity(HEADER_LENGTH);
        // Writing into a String cannot fail
        let _ = write!(
            text,
            "{:04x}{:04x}{:x}",
            self.body_size,
            self.sequence,
            self.flag & 0x0F
        );
        let mut out = [0u8; HEADER_LENGTH];
        out.copy_from_slice(text.as_bytes());
        out
    }

    /// Parse the first 9 bytes of `bytes`.
    ///
    /// Fails with [`ProtocolError::InvalidHeader`] when fewer than 9 bytes are
    /// available or any field is not hexadecimal.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LENGTH {
            return Err(ProtocolError::InvalidHeader);
        }
        Ok(Self {
            body_size: parse_hex(&bytes[0..4])?,
            sequence: parse_hex(&bytes[4..8])?,
            flag: parse_hex(&bytes[8..9])? as u8,
        })
    }

    /// No more frames follow for this message.
    pub fn is_final(&self) -> bool {
        self.flag == 0
    }

    /// Keepalive packet: empty body, not an answer to anything.
    pub fn is_heartbeat(&self) -> bool {
        self.body_size == 0
    }
}

// from_str_radix accepts a leading '+', so digits are checked first
fn parse_hex(field: &[u8]) -> Result<u16> {
    if !field.iter().all(u8::is_ascii_hexdigit) {
        return Err(ProtocolError::InvalidHeader);
    }
    let text = std::str::from_utf8(field).map_err(|_| ProtocolError::InvalidHeader)?;
    u16::from_str_radix(text, 16).map_err(|_| ProtocolError::InvalidHeader)
}
