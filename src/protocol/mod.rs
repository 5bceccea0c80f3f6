//! # Protocol Layer
//!
//! Protocol vocabulary and the login handshake.
//!
//! ## Components
//! - **Consts**: version, prefix, command and field names, [`RequestParams`](consts::RequestParams)
//! - **RetCode**: the server's return code table
//! - **Auth**: the AUTH_START / AUTH_ANSWER challenge-response state machine

pub mod auth;
pub mod consts;
pub mod retcode;

#[cfg(test)]
mod tests;
