//! In-process Web API server for integration tests.
//!
//! The server side of a `tokio::io::duplex` pipe. It speaks the wire format
//! through the crate's own header and text helpers.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use mt5_webapi::core::header::{FrameHeader, HEADER_LENGTH};
use mt5_webapi::core::response::parse_response_line;
use mt5_webapi::core::text;
use mt5_webapi::protocol::consts::WEB_PREFIX_WEBAPI;
use mt5_webapi::transport::{Transport, TransportOptions};
use mt5_webapi::utils::crypto::hash_password;
use mt5_webapi::utils::metrics::Metrics;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

pub const PASSWORD: &str = "Manager1";
pub const SRV_RAND: &str = "aabbccddeeff00112233445566778899";

/// One request as the server saw it.
#[derive(Debug)]
pub struct Request {
    pub prefixed: bool,
    pub header: FrameHeader,
    pub text: String,
}

impl Request {
    pub fn command(&self) -> String {
        parse_response_line(&self.text).0
    }

    pub fn params(&self) -> HashMap<String, String> {
        parse_response_line(&self.text).1
    }

    /// Text after the request line.
    pub fn payload(&self) -> &str {
        self.text.split_once("\r\n").map(|(_, rest)| rest).unwrap_or("")
    }
}

pub struct MockServer {
    stream: DuplexStream,
    pub password: String,
}

/// A transport connected to a fresh mock server.
pub fn connected(options: TransportOptions) -> (Transport<DuplexStream>, MockServer) {
    connected_with_metrics(options, Arc::default())
}

pub fn connected_with_metrics(
    options: TransportOptions,
    metrics: Arc<Metrics>,
) -> (Transport<DuplexStream>, MockServer) {
    let (client, server) = duplex(256 * 1024);
    (
        Transport::with_metrics(client, options, metrics),
        MockServer {
            stream: server,
            password: PASSWORD.to_string(),
        },
    )
}

impl MockServer {
    pub async fn read_request(&mut self) -> Request {
        let mut head = [0u8; HEADER_LENGTH];
        self.stream.read_exact(&mut head).await.unwrap();

        let prefixed = &head[..] == WEB_PREFIX_WEBAPI.as_bytes();
        if prefixed {
            self.stream.read_exact(&mut head).await.unwrap();
        }
        let header = FrameHeader::decode(&head).unwrap();

        let mut body = vec![0u8; header.body_size as usize];
        self.stream.read_exact(&mut body).await.unwrap();
        Request {
            prefixed,
            header,
            text: text::from_wire(&body).unwrap(),
        }
    }

    pub async fn write_bytes(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    pub async fn send_raw(&mut self, sequence: u16, flag: u8, body: &[u8]) {
        let header = FrameHeader::new(body.len() as u16, sequence, flag);
        self.stream.write_all(&header.encode()).await.unwrap();
        self.stream.write_all(body).await.unwrap();
    }

    pub async fn send_text(&mut self, sequence: u16, flag: u8, answer: &str) {
        self.send_raw(sequence, flag, &text::to_wire(answer)).await;
    }

    pub async fn heartbeat(&mut self) {
        self.send_raw(0, 0, &[]).await;
    }

    /// Read a request and answer it in one frame with the same sequence number.
    pub async fn answer(&mut self, answer: &str) -> Request {
        let request = self.read_request().await;
        self.send_text(request.header.sequence, 0, answer).await;
        request
    }

    /// Play the server side of a successful login.
    pub async fn accept_login(&mut self) -> (Request, Request) {
        let start = self
            .answer(&format!("AUTH_START|RETCODE=0 Done|SRV_RAND={SRV_RAND}|\r\n"))
            .await;

        let reply = self.read_request().await;
        let params = reply.params();
        assert_eq!(
            params["SRV_RAND_ANSWER"],
            hash_password(&self.password, SRV_RAND).unwrap()
        );
        let proof = hash_password(&self.password, &params["CLI_RAND"]).unwrap();
        self.send_text(
            reply.header.sequence,
            0,
            &format!(
                "AUTH_ANSWER|RETCODE=0 Done|CLI_RAND_ANSWER={proof}|CRYPT_RAND={}|\r\n",
                "5a".repeat(256)
            ),
        )
        .await;
        (start, reply)
    }

    /// Bytes written by the client until it closes the stream.
    pub async fn drain(mut self) -> Vec<u8> {
        let mut rest = Vec::new();
        let _ = self.stream.read_to_end(&mut rest).await;
        rest
    }
}
