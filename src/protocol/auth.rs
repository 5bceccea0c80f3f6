//! Challenge-response login handshake.
//!
//! ```text
//! client                                   server
//!   AUTH_START  VERSION AGENT LOGIN TYPE CRYPT_METHOD  ->
//!            <-  AUTH_START  RETCODE SRV_RAND
//!   AUTH_ANSWER SRV_RAND_ANSWER CLI_RAND  ->
//!            <-  AUTH_ANSWER RETCODE CLI_RAND_ANSWER CRYPT_RAND
//! ```
//!
//! `SRV_RAND_ANSWER` proves the client knows the password and
//! `CLI_RAND_ANSWER` proves the server does. Both are produced by
//! [`hash_password`].
//!
//! **Per-Handshake State**
//! The challenge values live in an [`Authenticator`] that is created for one
//! connection and dropped afterwards. The steps are plain functions over
//! [`Response`] values so the state machine can be driven without a socket;
//! [`Authenticator::authenticate`] runs them over a [`Transport`].

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, instrument, warn};

use crate::core::response::Response;
use crate::error::{ProtocolError, Result};
use crate::protocol::consts::{
    Command, CryptMethod, Param, RequestParams, CONNECTION_TYPE_MANAGER, WEB_API_VERSION,
    WEB_API_WORD,
};
use crate::transport::{ReadOptions, Transport};
use crate::utils::crypto::{hash_password, random_hex};
use crate::utils::metrics::Timer;

/// Bytes of client randomness sent in `CLI_RAND`.
pub const CLIENT_RAND_BYTES: usize = 16;

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingStartAnswer,
    AwaitingAnswerAck,
    Authenticated,
    Failed,
}

/// Result of a completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    /// Server randomness for cipher derivation, when the server sent one.
    pub crypt_rand: Option<String>,
}

/// Drives one login handshake.
pub struct Authenticator {
    login: String,
    password: String,
    agent: String,
    crypt_method: CryptMethod,
    state: AuthState,
    client_rand: Option<String>,
}

impl Authenticator {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            agent: WEB_API_WORD.to_string(),
            crypt_method: CryptMethod::None,
            state: AuthState::Idle,
            client_rand: None,
        }
    }

    /// Agent identifier reported to the server.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    pub fn with_crypt_method(mut self, method: CryptMethod) -> Self {
        self.crypt_method = method;
        self
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Build the `AUTH_START` request. Only valid in [`AuthState::Idle`].
    pub fn start_request(&mut self) -> Result<RequestParams> {
        self.expect_state(AuthState::Idle)?;
        if self.login.is_empty() {
            return Err(self.fail(ProtocolError::MissingField(Param::Login.as_str())));
        }
        if self.password.is_empty() {
            return Err(self.fail(ProtocolError::MissingField(Param::Password.as_str())));
        }

        self.state = AuthState::AwaitingStartAnswer;
        Ok(RequestParams::new()
            .with(Param::Version, WEB_API_VERSION)
            .with(Param::Agent, self.agent.as_str())
            .with(Param::Login, self.login.as_str())
            .with(Param::Type, CONNECTION_TYPE_MANAGER)
            .with(Param::CryptMethod, self.crypt_method.as_str()))
    }

    /// Check the `AUTH_START` answer and build the `AUTH_ANSWER` request.
    pub fn on_start_answer(&mut self, answer: &Response) -> Result<RequestParams> {
        self.expect_state(AuthState::AwaitingStartAnswer)?;
        let params = self.answer_params(answer).map_err(|e| self.fail(e))?;
        self.state = AuthState::AwaitingAnswerAck;
        Ok(params)
    }

    fn answer_params(&mut self, answer: &Response) -> Result<RequestParams> {
        answer.expect_command(Command::AuthStart)?;
        answer.retcode()?.into_result()?;
        let srv_rand = answer.require(Param::SrvRand)?;

        let srv_rand_answer = hash_password(&self.password, srv_rand)?;
        let client_rand = random_hex(CLIENT_RAND_BYTES);
        let params = RequestParams::new()
            .with(Param::SrvRandAnswer, srv_rand_answer)
            .with(Param::CliRand, client_rand.as_str());
        self.client_rand = Some(client_rand);
        Ok(params)
    }

    /// Check the `AUTH_ANSWER` answer, including the server's proof.
    pub fn on_answer_ack(&mut self, answer: &Response) -> Result<AuthOutcome> {
        self.expect_state(AuthState::AwaitingAnswerAck)?;
        let outcome = self.verify_server(answer).map_err(|e| self.fail(e))?;
        self.state = AuthState::Authenticated;
        self.client_rand = None;
        Ok(outcome)
    }

    fn verify_server(&self, answer: &Response) -> Result<AuthOutcome> {
        answer.expect_command(Command::AuthAnswer)?;
        answer.retcode()?.into_result()?;
        let echoed = answer.require(Param::CliRandAnswer)?;

        let client_rand = self
            .client_rand
            .as_deref()
            .ok_or(ProtocolError::MissingField(Param::CliRand.as_str()))?;
        let expected = hash_password(&self.password, client_rand)?;
        if !expected.eq_ignore_ascii_case(echoed) {
            return Err(ProtocolError::ServerNotAuthenticated);
        }

        Ok(AuthOutcome {
            crypt_rand: answer.require(Param::CryptRand).ok().map(str::to_string),
        })
    }

    /// Run the whole handshake over `transport`.
    ///
    /// On success the transport is marked authenticated and, when a cipher was
    /// requested, receives its cipher state. On failure the caller should
    /// disconnect; nothing is retried.
    #[instrument(skip(self, transport), fields(login = %self.login))]
    pub async fn authenticate<S>(&mut self, transport: &mut Transport<S>) -> Result<AuthOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let metrics = transport.metrics().clone();
        metrics.handshake_attempt();
        let _timer = Timer::start("handshake");

        match self.run(transport).await {
            Ok(outcome) => {
                metrics.handshake_success();
                info!("Authenticated");
                Ok(outcome)
            }
            Err(e) => {
                self.fail_in_place();
                metrics.handshake_failed();
                warn!(error = %e, "Authentication failed");
                Err(e)
            }
        }
    }

    async fn run<S>(&mut self, transport: &mut Transport<S>) -> Result<AuthOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let start = self.start_request()?;
        transport.send(Command::AuthStart, &start).await?;
        let answer = transport.read_response(ReadOptions::AUTH).await?;

        let reply = self.on_start_answer(&answer)?;
        debug!("Server challenge accepted");
        transport.send(Command::AuthAnswer, &reply).await?;
        let answer = transport.read_response(ReadOptions::AUTH).await?;

        let outcome = self.on_answer_ack(&answer)?;
        if self.crypt_method != CryptMethod::None {
            let crypt_rand = outcome
                .crypt_rand
                .as_deref()
                .ok_or(ProtocolError::MissingField(Param::CryptRand.as_str()))?;
            transport.set_cipher_state(crypt_rand, &self.password)?;
        }
        transport.set_authenticated(true);
        Ok(outcome)
    }

    fn expect_state(&mut self, expected: AuthState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.fail(ProtocolError::InvalidField {
                field: "state",
                reason: format!("handshake is {:?}, expected {:?}", self.state, expected),
            }))
        }
    }

    fn fail(&mut self, error: ProtocolError) -> ProtocolError {
        self.fail_in_place();
        error
    }

    fn fail_in_place(&mut self) {
        self.state = AuthState::Failed;
        self.client_rand = None;
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("login", &self.login)
            .field("agent", &self.agent)
            .field("crypt_method", &self.crypt_method)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
