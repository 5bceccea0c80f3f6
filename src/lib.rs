//! # mt5-webapi
//!
//! Client protocol engine for the MetaTrader 5 manager Web API.
//!
//! The crate turns a TCP byte stream into typed request/answer exchanges:
//! hex-headed frames carrying UTF-16LE `COMMAND|KEY=VALUE|...` text,
//! reassembly of answers split over several frames, a challenge-response
//! login that proves both sides know the password, and the server's
//! return-code table.
//!
//! ## Layers
//! - [`core`]: frame header, codec, text encoding, answer parsing
//! - [`protocol`]: constants, return codes, the login handshake
//! - [`transport`]: the connection, sequencing and timeouts
//! - [`service`]: [`Session`](service::Session), the account operations
//! - [`utils`]: password hashing, timeouts, logging, metrics
//!
//! ## Quick Start
//! ```no_run
//! use mt5_webapi::config::WebApiConfig;
//! use mt5_webapi::service::Session;
//!
//! # async fn run() -> mt5_webapi::error::Result<()> {
//! let config = WebApiConfig::default_with_overrides(|c| {
//!     c.client.host = "mt5.example.com".into();
//!     c.client.port = 443;
//! });
//! let mut session = Session::connect(&config, "1000", "manager-password").await?;
//! session.set_user_group(100, "demo\\forex", Some(100)).await?;
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::error::{ErrorKind, ProtocolError, Result};
pub use crate::protocol::retcode::RetCode;
