use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

use crate::config::{ClientConfig, WebApiConfig};
use crate::error::{ProtocolError, Result};
use crate::protocol::auth::Authenticator;
use crate::protocol::consts::{Command, CryptMethod, Param, RequestParams};
use crate::transport::{ReadOptions, Transport};
use crate::utils::metrics::{Metrics, Timer};

/// Kind of balance operation for [`Session::set_user_balance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceType {
    Balance = 2,
    Credit = 3,
    /// Additional adding or withdrawing
    Charge = 4,
    Correction = 5,
    Bonus = 6,
}

impl BalanceType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Which password [`Session::set_user_password`] changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordType {
    #[default]
    Main,
    Investor,
    Api,
}

impl PasswordType {
    pub fn as_str(self) -> &'static str {
        match self {
            PasswordType::Main => "MAIN",
            PasswordType::Investor => "INVESTOR",
            PasswordType::Api => "API",
        }
    }
}

#[derive(Serialize)]
struct SymbolSwap<'a> {
    #[serde(rename = "Symbol")]
    symbol: &'a str,
    #[serde(rename = "SwapLong")]
    swap_long: f64,
    #[serde(rename = "SwapShort")]
    swap_short: f64,
}

/// An authenticated manager connection with the common account operations.
///
/// Every operation sends one command, reads the first line of the answer and
/// maps a non-zero `RETCODE` to [`ProtocolError::RetCode`].
pub struct Session<S = TcpStream> {
    transport: Option<Transport<S>>,
}

impl Session<TcpStream> {
    /// Connect to the server in `config` and log in.
    ///
    /// The connection is closed again when the handshake fails.
    pub async fn connect(config: &WebApiConfig, login: &str, password: &str) -> Result<Self> {
        Self::connect_with_metrics(config, login, password, Arc::default()).await
    }

    /// [`Session::connect`] reporting into shared counters.
    #[instrument(skip(config, password, metrics), fields(address = %config.client.address()))]
    pub async fn connect_with_metrics(
        config: &WebApiConfig,
        login: &str,
        password: &str,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let transport = Transport::connect_config(config, metrics).await?;
        Self::from_transport(transport, &config.client, login, password).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Log in over an already open transport.
    pub async fn from_transport(
        mut transport: Transport<S>,
        client: &ClientConfig,
        login: &str,
        password: &str,
    ) -> Result<Self> {
        let crypt_method = if client.encryption_enabled {
            CryptMethod::Aes256Ofb
        } else {
            CryptMethod::None
        };
        let mut auth = Authenticator::new(login, password)
            .with_agent(client.agent.as_str())
            .with_crypt_method(crypt_method);

        match auth.authenticate(&mut transport).await {
            Ok(_) => Ok(Self {
                transport: Some(transport),
            }),
            Err(e) => {
                if let Err(close) = transport.disconnect().await {
                    debug!(error = %close, "Close after failed login");
                }
                Err(e)
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(Transport::is_connected)
    }

    /// The underlying transport, for commands this type does not wrap.
    pub fn transport_mut(&mut self) -> Option<&mut Transport<S>> {
        self.transport.as_mut()
    }

    /// Say `QUIT` and close the connection.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };
        if transport.is_authenticated() {
            if let Err(e) = transport.send(Command::Quit, &RequestParams::new()).await {
                debug!(error = %e, "QUIT not delivered");
            }
        }
        let closed = transport.disconnect().await;
        transport.metrics().log_metrics();
        closed
    }

    /// Create an account.
    ///
    /// `name` defaults to the login and `pass_investor` to `password`.
    #[instrument(skip(self, password, pass_investor))]
    pub async fn user_add(
        &mut self,
        login: u64,
        password: &str,
        group: &str,
        name: Option<&str>,
        pass_investor: Option<&str>,
    ) -> Result<()> {
        self.ensure_connected()?;
        require_login(login)?;
        require(Param::PassMain, password)?;
        require(Param::Group, group)?;

        let login = login.to_string();
        let name = name.filter(|n| !n.is_empty()).unwrap_or(login.as_str());
        let pass_investor = pass_investor.filter(|p| !p.is_empty()).unwrap_or(password);
        let params = RequestParams::new()
            .with(Param::PassMain, password)
            .with(Param::Login, login.as_str())
            .with(Param::PassInvestor, pass_investor)
            .with(Param::Group, group)
            .with(Param::Name, name);
        self.exchange(Command::UserAdd, &params).await
    }

    /// Move an account to `group`, optionally changing its leverage.
    #[instrument(skip(self))]
    pub async fn set_user_group(
        &mut self,
        login: u64,
        group: &str,
        leverage: Option<u32>,
    ) -> Result<()> {
        self.ensure_connected()?;
        require_login(login)?;
        require(Param::Group, group)?;

        let mut params = RequestParams::new()
            .with(Param::Login, login.to_string())
            .with(Param::Group, group);
        if let Some(leverage) = leverage {
            params.set(Param::Leverage, leverage.to_string());
        }
        self.exchange(Command::UserUpdate, &params).await
    }

    /// Post a balance operation. A negative `amount` withdraws.
    #[instrument(skip(self))]
    pub async fn set_user_balance(
        &mut self,
        login: u64,
        balance_type: BalanceType,
        amount: f64,
        comment: &str,
    ) -> Result<()> {
        self.ensure_connected()?;
        require_login(login)?;
        if !amount.is_finite() {
            return Err(ProtocolError::InvalidField {
                field: Param::Balance.as_str(),
                reason: format!("{amount} is not a finite amount"),
            });
        }

        let params = RequestParams::new()
            .with(Param::Login, login.to_string())
            .with(Param::Type, balance_type.code().to_string())
            .with(Param::Balance, amount.to_string())
            .with(Param::Comment, comment)
            .with(Param::CheckMargin, "1");
        self.exchange(Command::TradeBalance, &params).await
    }

    #[instrument(skip(self, password))]
    pub async fn set_user_password(
        &mut self,
        login: u64,
        password: &str,
        pass_type: PasswordType,
    ) -> Result<()> {
        self.ensure_connected()?;
        require_login(login)?;
        require(Param::Password, password)?;

        let params = RequestParams::new()
            .with(Param::Login, login.to_string())
            .with(Param::Type, pass_type.as_str())
            .with(Param::Password, password);
        self.exchange(Command::UserPassChange, &params).await
    }

    /// Update the swap rates of a symbol.
    #[instrument(skip(self))]
    pub async fn set_symbol_swap(
        &mut self,
        symbol: &str,
        swap_long: f64,
        swap_short: f64,
    ) -> Result<()> {
        self.ensure_connected()?;
        require(Param::Symbol, symbol)?;

        let body = serde_json::to_string(&SymbolSwap {
            symbol,
            swap_long,
            swap_short,
        })?;
        let params = RequestParams::new().with(Param::BodyText, body);
        self.exchange(Command::SymbolAdd, &params).await
    }

    /// Keepalive. The server does not answer `PING`.
    pub async fn ping(&mut self) -> Result<()> {
        self.transport_or_err()?
            .send(Command::Ping, &RequestParams::new())
            .await
    }

    async fn exchange(&mut self, command: Command, params: &RequestParams) -> Result<()> {
        let _timer = Timer::start(command.as_str());
        let transport = self.transport_or_err()?;
        transport.send(command, params).await?;
        let answer = transport.read_response(ReadOptions::FIRST_LINE).await?;
        answer.expect_command(command)?;

        let code = answer.retcode()?;
        info!(command = %command, retcode = %code, "Command answered");
        code.into_result()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ProtocolError::NotConnected)
        }
    }

    fn transport_or_err(&mut self) -> Result<&mut Transport<S>> {
        self.transport.as_mut().ok_or(ProtocolError::NotConnected)
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport)
            .finish()
    }
}

fn require_login(login: u64) -> Result<()> {
    if login == 0 {
        Err(ProtocolError::MissingField(Param::Login.as_str()))
    } else {
        Ok(())
    }
}

fn require(param: Param, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ProtocolError::MissingField(param.as_str()))
    } else {
        Ok(())
    }
}
