//! # Transport Layer
//!
//! The connection to a Web API server: framing over a TCP stream, sequence
//! numbering, reassembly of multi-frame answers and timeouts.
//!
//! [`Transport`] is generic over the stream so it can run over anything that
//! implements `AsyncRead + AsyncWrite`; [`Transport::connect`] opens TCP.

pub mod connection;

pub use connection::{
    next_sequence, BinaryAnswer, ReadOptions, Transport, TransportOptions,
};
