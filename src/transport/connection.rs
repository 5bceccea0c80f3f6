//! Request/answer exchange over one byte stream.
//!
//! A [`Transport`] owns the stream, the outbound sequence counter and the
//! optional cipher state. Exchanges are half duplex: every method takes
//! `&mut self`, so only one request can be in flight on a connection.
//!
//! Answers may span several frames. [`Transport::read`] keeps reading until a
//! frame with flag 0 arrives and drops frames whose sequence number does not
//! belong to the last request (heartbeats and stale answers).

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, warn};

use crate::config::{
    StalePacketPolicy, WebApiConfig, DEFAULT_MAX_ANSWER_SIZE, DEFAULT_READ_BUFFER_SIZE,
};
use crate::core::codec::{encode_body, Frame, FrameCodec};
use crate::core::response::Response;
use crate::core::text;
use crate::error::{ProtocolError, Result};
use crate::protocol::consts::{Command, RequestParams, MAX_CLIENT_COMMAND};
use crate::utils::crypto::CipherState;
use crate::utils::metrics::Metrics;
use crate::utils::timeout::{with_timeout_error, DEFAULT_OPERATION_TIMEOUT};

/// Sequence number that follows `current`.
///
/// Client sequence numbers run from 1 to 16383 and then wrap back to 1.
pub fn next_sequence(current: u16) -> u16 {
    if current >= MAX_CLIENT_COMMAND {
        1
    } else {
        current + 1
    }
}

/// Settings applied to every exchange on a transport.
#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub operation_timeout: Duration,
    pub read_buffer_size: usize,
    pub stale_packet_policy: StalePacketPolicy,
    /// Largest reassembled answer body; larger answers fail with `OversizedPacket`.
    pub max_answer_size: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            stale_packet_policy: StalePacketPolicy::Discard,
            max_answer_size: DEFAULT_MAX_ANSWER_SIZE,
        }
    }
}

impl From<&WebApiConfig> for TransportOptions {
    fn from(config: &WebApiConfig) -> Self {
        Self {
            operation_timeout: config.client.operation_timeout,
            read_buffer_size: config.transport.read_buffer_size,
            stale_packet_policy: config.transport.stale_packet_policy,
            max_answer_size: config.transport.max_answer_size,
        }
    }
}

/// How an answer is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Handshake answer: never decrypted.
    pub auth_packet: bool,
    /// Keep only the first line of the first accepted frame.
    pub first_line_only: bool,
}

impl ReadOptions {
    /// Answer to AUTH_START or AUTH_ANSWER.
    pub const AUTH: Self = Self {
        auth_packet: true,
        first_line_only: false,
    };

    /// Short fixed-format answer of a business command.
    pub const FIRST_LINE: Self = Self {
        auth_packet: false,
        first_line_only: true,
    };
}

/// An answer whose payload is not text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryAnswer {
    /// The decoded answer line, including its line break.
    pub line: String,
    /// Raw bytes after the answer line.
    pub payload: Bytes,
}

/// Per-connection state. Reset on disconnect.
#[derive(Debug, Default)]
struct SessionState {
    sequence: u16,
    first_frame_sent: bool,
    authenticated: bool,
    cipher: Option<CipherState>,
}

/// One connection to a Web API server.
pub struct Transport<S> {
    framed: Option<Framed<S, FrameCodec>>,
    state: SessionState,
    options: TransportOptions,
    metrics: Arc<Metrics>,
}

impl Transport<TcpStream> {
    /// Open a TCP connection within `timeout`.
    #[instrument(skip(timeout), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        Self::connect_with(host, port, timeout, TransportOptions::default(), Arc::default()).await
    }

    /// Open a TCP connection described by `config`.
    pub async fn connect_config(config: &WebApiConfig, metrics: Arc<Metrics>) -> Result<Self> {
        Self::connect_with(
            &config.client.host,
            config.client.port,
            config.client.connection_timeout,
            TransportOptions::from(config),
            metrics,
        )
        .await
    }

    async fn connect_with(
        host: &str,
        port: u16,
        timeout: Duration,
        options: TransportOptions,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let stream = with_timeout_error(
            async { Ok(TcpStream::connect((host, port)).await?) },
            timeout,
        )
        .await
        .inspect_err(|e| {
            metrics.connection_error();
            warn!(host, port, error = %e, "Connection failed");
        })?;
        stream.set_nodelay(true)?;

        info!(host, port, "Connected");
        Ok(Transport::with_metrics(stream, options, metrics))
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already open stream.
    pub fn new(stream: S, options: TransportOptions) -> Self {
        Self::with_metrics(stream, options, Arc::default())
    }

    /// Wrap an already open stream, reporting into shared counters.
    pub fn with_metrics(stream: S, options: TransportOptions, metrics: Arc<Metrics>) -> Self {
        metrics.connection_established();
        Self {
            framed: Some(Framed::with_capacity(
                stream,
                FrameCodec,
                options.read_buffer_size,
            )),
            state: SessionState::default(),
            options,
            metrics,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated
    }

    /// Sequence number of the last request sent (0 before the first send).
    pub fn sequence(&self) -> u16 {
        self.state.sequence
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn cipher(&self) -> Option<&CipherState> {
        self.state.cipher.as_ref()
    }

    /// Derive and install cipher material from the server's `CRYPT_RAND`.
    ///
    /// Once installed, every non-handshake frame goes through the cipher,
    /// which currently refuses with [`ProtocolError::UnsupportedCipher`].
    pub fn set_cipher_state(&mut self, crypt_rand: &str, password: &str) -> Result<()> {
        self.state.cipher = Some(CipherState::derive(crypt_rand, password)?);
        debug!("Cipher state installed");
        Ok(())
    }

    pub(crate) fn set_authenticated(&mut self, authenticated: bool) {
        self.state.authenticated = authenticated;
    }

    /// Send one request.
    ///
    /// The very first frame of the connection carries the `MT5WEBAPI` prefix.
    /// Business commands are refused until the handshake has completed.
    ///
    /// The sequence counter only moves once the frame is built, so a request
    /// refused during encoding leaves it untouched. A failed write still
    /// consumes the number.
    #[instrument(skip(self, params), level = "debug", fields(command = %command))]
    pub async fn send(&mut self, command: Command, params: &RequestParams) -> Result<()> {
        if !command.is_handshake() && !self.state.authenticated {
            return Err(ProtocolError::NotAuthenticated);
        }
        let framed = self.framed.as_mut().ok_or(ProtocolError::NotConnected)?;

        let sequence = next_sequence(self.state.sequence);
        let mut body = encode_body(command.as_str(), params)?;
        if let Some(cipher) = self.state.cipher.as_mut() {
            if !command.is_handshake() {
                body = cipher.encrypt(&body)?;
            }
        }

        let frame = Frame::new(sequence, body, !self.state.first_frame_sent)?;
        let wire_len = frame.wire_len() as u64;
        self.state.sequence = sequence;
        debug!(sequence, bytes = wire_len, "Sending frame");

        with_timeout_error(framed.send(frame), self.options.operation_timeout)
            .await
            .inspect_err(|_| self.metrics.connection_error())?;

        self.state.first_frame_sent = true;
        self.metrics.frame_sent(wire_len);
        Ok(())
    }

    /// Read one answer and decode it as text.
    #[instrument(skip(self), level = "debug")]
    pub async fn read(&mut self, options: ReadOptions) -> Result<String> {
        let message = self.read_message(options).await?;
        text::from_wire(&message)
    }

    /// Read one answer and parse it.
    pub async fn read_response(&mut self, options: ReadOptions) -> Result<Response> {
        let answer = self.read(options).await?;
        Ok(Response::parse(&answer))
    }

    /// Read one answer, decoding only its first line.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_binary(&mut self, options: ReadOptions) -> Result<BinaryAnswer> {
        let mut message = self.read_message(options).await?;
        let end = text::first_line_end(&message).unwrap_or(message.len());
        let line = text::from_wire(&message.split_to(end))?;
        Ok(BinaryAnswer {
            line,
            payload: message.freeze(),
        })
    }

    /// Reassemble the frames of one answer.
    ///
    /// Every accepted body counts against `max_answer_size`, including the
    /// fragments dropped in first-line mode.
    async fn read_message(&mut self, options: ReadOptions) -> Result<BytesMut> {
        let expected = self.state.sequence;
        let mut message = BytesMut::new();
        let mut accepted = 0usize;
        let mut total = 0usize;

        loop {
            let frame = self.next_frame().await?;
            let header = frame.header;

            if header.sequence != expected {
                self.skip_stale(expected, &frame)?;
                continue;
            }

            total += frame.body.len();
            if total > self.options.max_answer_size {
                self.metrics.protocol_error();
                warn!(
                    bytes = total,
                    limit = self.options.max_answer_size,
                    "Answer exceeds size limit"
                );
                return Err(ProtocolError::OversizedPacket(total));
            }

            let body = match self.state.cipher.as_mut() {
                Some(cipher) if !options.auth_packet => Bytes::from(cipher.decrypt(&frame.body)?),
                _ => frame.body,
            };

            if !options.first_line_only {
                message.extend_from_slice(&body);
            } else if accepted == 0 {
                let end = text::first_line_end(&body).unwrap_or(body.len());
                message.extend_from_slice(&body[..end]);
            }
            accepted += 1;

            if header.is_final() {
                debug!(frames = accepted, bytes = message.len(), "Answer complete");
                return Ok(message);
            }
        }
    }

    fn skip_stale(&self, expected: u16, frame: &Frame) -> Result<()> {
        let received = frame.header.sequence;
        if frame.header.is_heartbeat() {
            self.metrics.heartbeat_skipped();
            debug!(expected, received, "Skipping heartbeat");
            return Ok(());
        }

        self.metrics.stale_packet();
        match self.options.stale_packet_policy {
            StalePacketPolicy::Discard => {
                warn!(
                    expected,
                    received,
                    body_size = frame.header.body_size,
                    "Discarding packet with unexpected sequence"
                );
                Ok(())
            }
            StalePacketPolicy::Reject => {
                self.metrics.protocol_error();
                Err(ProtocolError::UnexpectedSequence { expected, received })
            }
        }
    }

    async fn next_frame(&mut self) -> Result<Frame> {
        let framed = self.framed.as_mut().ok_or(ProtocolError::NotConnected)?;
        let frame = with_timeout_error(
            async { framed.next().await.ok_or(ProtocolError::ConnectionClosed)? },
            self.options.operation_timeout,
        )
        .await
        .inspect_err(|e| {
            if e.is_transport() {
                self.metrics.connection_error();
            } else {
                self.metrics.protocol_error();
            }
        })?;

        self.metrics.frame_received(frame.wire_len() as u64);
        Ok(frame)
    }

    /// Close the stream and forget all session state.
    ///
    /// Calling it on a closed transport is a no-op.
    #[instrument(skip(self), level = "debug")]
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(mut framed) = self.framed.take() else {
            return Ok(());
        };
        self.state = SessionState::default();
        self.metrics.connection_closed();

        let closed = with_timeout_error(
            async { SinkExt::<Frame>::close(&mut framed).await },
            self.options.operation_timeout,
        )
        .await;
        if let Err(e) = &closed {
            debug!(error = %e, "Stream did not close cleanly");
        }
        info!("Disconnected");
        closed
    }
}

impl<S> Drop for Transport<S> {
    fn drop(&mut self) {
        if self.framed.is_some() {
            self.metrics.connection_closed();
        }
    }
}

impl<S> std::fmt::Debug for Transport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("connected", &self.framed.is_some())
            .field("authenticated", &self.state.authenticated)
            .field("sequence", &self.state.sequence)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
