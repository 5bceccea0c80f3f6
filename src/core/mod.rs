//! # Core Protocol Components
//!
//! Framing, text encoding and answer parsing. Nothing in here performs I/O.
//!
//! ## Components
//! - **Header**: the fixed 9-character frame header
//! - **Codec**: request body encoding and a Tokio codec for framing byte streams
//! - **Text**: UTF-16LE conversion used on the wire
//! - **Response**: parsing of `COMMAND|KEY=VALUE|...` answers
//!
//! ## Wire Format
//! ```text
//! [MT5WEBAPI, first frame only] [BodySize(4 hex)] [Sequence(4 hex)] [Flag(1 hex)] [Body(N)]
//! ```

pub mod codec;
pub mod header;
pub mod response;
pub mod text;
