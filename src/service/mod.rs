//! # Service Layer
//!
//! High-level account administration on top of the transport and handshake.
//!
//! ## Example
//! ```no_run
//! use mt5_webapi::config::WebApiConfig;
//! use mt5_webapi::service::session::{BalanceType, Session};
//!
//! # async fn run() -> mt5_webapi::error::Result<()> {
//! let config = WebApiConfig::from_file("webapi.toml")?;
//! let mut session = Session::connect(&config, "1000", "manager-password").await?;
//! session
//!     .set_user_balance(100, BalanceType::Balance, 250.0, "deposit")
//!     .await?;
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod session;

pub use session::{BalanceType, PasswordType, Session};
