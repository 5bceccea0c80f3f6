//! # Error Types
//!
//! Error handling for the Web API protocol engine.
//!
//! Every public operation returns [`Result`], and every failure the engine can
//! detect has its own variant. Variants fall into the categories reported by
//! [`ProtocolError::kind`]:
//! - **Transport**: socket failures, timeouts, malformed frame headers
//! - **Protocol**: the server answered with the wrong command or left out a field
//! - **Authentication**: the server could not prove it knows the password
//! - **Application**: a non-zero return code sent by the server
//! - **Configuration**: invalid settings
//!
//! ## Example Usage
//! ```rust
//! use mt5_webapi::error::{ErrorKind, ProtocolError};
//! use mt5_webapi::protocol::retcode::RetCode;
//!
//! let err = ProtocolError::RetCode(RetCode::ErrFrequent);
//! assert_eq!(err.kind(), ErrorKind::Application);
//! assert_eq!(err.retcode(), RetCode::ErrFrequent);
//! ```

use crate::protocol::retcode::RetCode;
use std::io;
use thiserror::Error;

/// Static error message strings.
pub mod constants {
    /// Framing errors
    pub const ERR_TRUNCATED_FRAME: &str = "Stream closed in the middle of a frame";

    /// Request encoding errors
    pub const ERR_RESERVED_CHARACTER: &str = "value contains a reserved character (| = CR LF)";

    /// Text encoding errors
    pub const ERR_ODD_UTF16_LENGTH: &str = "UTF-16LE payload has an odd byte length";
    pub const ERR_INVALID_UTF16: &str = "Payload is not valid UTF-16LE";

    /// Cipher errors
    pub const ERR_CIPHER_UNSUPPORTED: &str = "Packet encryption is not supported";
    pub const ERR_CRYPT_RAND_LENGTH: &str = "CRYPT_RAND must hold 512 hex characters";
}

/// Broad category of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte stream failed; reconnecting is the usual remedy.
    Transport,
    /// The server answered with something the engine did not expect.
    Protocol,
    /// The challenge-response handshake did not prove both sides.
    Authentication,
    /// The server returned a non-zero return code.
    Application,
    /// Settings are invalid.
    Configuration,
}

// ProtocolError is the error type for every engine operation
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Operation timed out")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Invalid frame header")]
    InvalidHeader,

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Unexpected packet sequence: expected {expected}, received {received}")]
    UnexpectedSequence { expected: u16, received: u16 },

    #[error("Answer \"{received}\" is incorrect, expected {expected}")]
    UnexpectedCommand { expected: String, received: String },

    #[error("Answer is missing field {0}")]
    MissingField(&'static str),

    #[error("Field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Text encoding error: {0}")]
    Encoding(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server sent incorrect password hash")]
    ServerNotAuthenticated,

    #[error("Command issued before authentication completed")]
    NotAuthenticated,

    #[error("Server returned {0}")]
    RetCode(RetCode),

    #[error("Malformed return code: {0:?}")]
    MalformedRetCode(String),

    #[error("Unsupported cipher: {0}")]
    UnsupportedCipher(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Io(_)
            | ProtocolError::Timeout
            | ProtocolError::ConnectionClosed
            | ProtocolError::NotConnected
            | ProtocolError::InvalidHeader
            | ProtocolError::OversizedPacket(_)
            | ProtocolError::UnexpectedSequence { .. } => ErrorKind::Transport,
            ProtocolError::UnexpectedCommand { .. }
            | ProtocolError::MissingField(_)
            | ProtocolError::InvalidField { .. }
            | ProtocolError::Encoding(_)
            | ProtocolError::Json(_)
            | ProtocolError::MalformedRetCode(_)
            | ProtocolError::UnsupportedCipher(_) => ErrorKind::Protocol,
            ProtocolError::ServerNotAuthenticated | ProtocolError::NotAuthenticated => {
                ErrorKind::Authentication
            }
            ProtocolError::RetCode(_) => ErrorKind::Application,
            ProtocolError::ConfigError(_) => ErrorKind::Configuration,
        }
    }

    /// Closest server return code for this error.
    ///
    /// Lets a facade report one numeric status per call, whichever layer failed.
    pub fn retcode(&self) -> RetCode {
        match self {
            ProtocolError::RetCode(code) => *code,
            ProtocolError::Timeout => RetCode::ErrTimeout,
            ProtocolError::NotConnected => RetCode::ErrConnection,
            ProtocolError::ServerNotAuthenticated => RetCode::AuthServerBad,
            ProtocolError::NotAuthenticated => RetCode::ErrPermissions,
            ProtocolError::MissingField(_) => RetCode::ErrParams,
            ProtocolError::UnsupportedCipher(_) => RetCode::ErrNotSupported,
            ProtocolError::ConfigError(_) => RetCode::ErrParams,
            ProtocolError::UnexpectedCommand { .. }
            | ProtocolError::InvalidField { .. }
            | ProtocolError::Encoding(_)
            | ProtocolError::Json(_)
            | ProtocolError::MalformedRetCode(_) => RetCode::ErrData,
            ProtocolError::Io(_)
            | ProtocolError::ConnectionClosed
            | ProtocolError::InvalidHeader
            | ProtocolError::OversizedPacket(_)
            | ProtocolError::UnexpectedSequence { .. } => RetCode::ErrNetwork,
        }
    }

    /// True when reconnecting is the only way forward.
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
