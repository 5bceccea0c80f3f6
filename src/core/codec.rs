//! Frame codec for `tokio_util::codec::Framed`.
//!
//! Outbound frames are built from a command and its parameters:
//!
//! ```text
//! [MT5WEBAPI, first frame only] [BodySize] [Sequence] [Flag] [Body]
//! Body = UTF-16LE("COMMAND|KEY1=VAL1|KEY2=VAL2|\r\n[BODY_TEXT payload]")
//! ```
//!
//! Inbound frames never carry the prefix. The decoder waits for the 9-byte
//! header and then for `BodySize` body bytes before yielding a [`Frame`];
//! continuation and sequence handling belong to the transport.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::core::header::{FrameHeader, HEADER_LENGTH};
use crate::core::text;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::consts::{Param, RequestParams, RESERVED_CHARS, WEB_PREFIX_WEBAPI};

/// One physical frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    /// Emit the `MT5WEBAPI` prefix in front of the header.
    pub prefixed: bool,
    pub body: Bytes,
}

impl Frame {
    /// Build a final (flag 0) frame around an encoded body.
    pub fn new(sequence: u16, body: impl Into<Bytes>, prefixed: bool) -> Result<Self> {
        let body = body.into();
        let body_size =
            u16::try_from(body.len()).map_err(|_| ProtocolError::OversizedPacket(body.len()))?;
        Ok(Self {
            header: FrameHeader::new(body_size, sequence, 0),
            prefixed,
            body,
        })
    }

    /// Empty keepalive frame.
    pub fn heartbeat() -> Self {
        Self {
            header: FrameHeader::new(0, 0, 0),
            prefixed: false,
            body: Bytes::new(),
        }
    }

    /// Set the continuation flag.
    pub fn with_flag(mut self, flag: u8) -> Self {
        self.header.flag = flag;
        self
    }

    /// Encoded length including prefix and header.
    pub fn wire_len(&self) -> usize {
        let prefix = if self.prefixed {
            WEB_PREFIX_WEBAPI.len()
        } else {
            0
        };
        prefix + HEADER_LENGTH + self.body.len()
    }
}

/// Build the body of a request in the wire encoding.
///
/// `BODY_TEXT` is not written as a key=value pair; its value is appended
/// verbatim after the line break. Any other value holding one of
/// [`RESERVED_CHARS`] is refused, since it would split the request line.
pub fn encode_body(command: &str, params: &RequestParams) -> Result<Vec<u8>> {
    let mut line = String::from(command);
    if params.is_empty() {
        line.push_str("|\r\n");
        return Ok(text::to_wire(&line));
    }

    let mut payload = None;
    line.push('|');
    for (param, value) in params.iter() {
        if param == Param::BodyText {
            payload = Some(value);
            continue;
        }
        if value.contains(RESERVED_CHARS) {
            return Err(ProtocolError::InvalidField {
                field: param.as_str(),
                reason: constants::ERR_RESERVED_CHARACTER.to_string(),
            });
        }
        line.push_str(param.as_str());
        line.push('=');
        line.push_str(value);
        line.push('|');
    }
    line.push_str("\r\n");
    if let Some(payload) = payload {
        line.push_str(payload);
    }
    Ok(text::to_wire(&line))
}

/// Encode a complete request frame.
pub fn encode_frame(
    command: &str,
    params: &RequestParams,
    sequence: u16,
    first_frame: bool,
) -> Result<Bytes> {
    let frame = Frame::new(sequence, encode_body(command, params)?, first_frame)?;
    let mut dst = BytesMut::with_capacity(frame.wire_len());
    FrameCodec.encode(frame, &mut dst)?;
    Ok(dst.freeze())
}

/// Stateless codec for [`Frame`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < HEADER_LENGTH {
            return Ok(None);
        }

        let header = FrameHeader::decode(&src[..HEADER_LENGTH])?;
        let total = HEADER_LENGTH + header.body_size as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        let body = frame.split_off(HEADER_LENGTH).freeze();
        Ok(Some(Frame {
            header,
            prefixed: false,
            body,
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => {
                debug!(
                    remaining = src.len(),
                    "{}",
                    constants::ERR_TRUNCATED_FRAME
                );
                Err(ProtocolError::ConnectionClosed)
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        if frame.body.len() > u16::MAX as usize {
            return Err(ProtocolError::OversizedPacket(frame.body.len()));
        }
        dst.reserve(frame.wire_len());
        if frame.prefixed {
            dst.put_slice(WEB_PREFIX_WEBAPI.as_bytes());
        }
        dst.put_slice(&frame.header.encode());
        dst.put_slice(&frame.body);
        Ok(())
    }
}
