//! # Utility Modules
//!
//! Supporting utilities for credential hashing, timing, logging and metrics.
//!
//! ## Components
//! - **Crypto**: challenge-response password hashing and cipher material
//! - **Timeout**: async timeout wrappers
//! - **Logging**: subscriber setup from [`LoggingConfig`](crate::config::LoggingConfig)
//! - **Metrics**: thread-safe connection counters

pub mod crypto;
pub mod logging;
pub mod metrics;
pub mod timeout;

pub use crypto::{hash_password, random_hex, CipherState};
pub use metrics::{Metrics, MetricsSnapshot};
