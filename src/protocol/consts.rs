//! Protocol constants, command names and request parameters.

use std::fmt;

/// Web API protocol version announced in `AUTH_START`.
pub const WEB_API_VERSION: &str = "1881";

/// Literal prefix sent in front of the very first frame of a connection.
pub const WEB_PREFIX_WEBAPI: &str = "MT5WEBAPI";

/// Application word mixed into the password hash.
pub const WEB_API_WORD: &str = "WebAPI";

/// Connection type announced in `AUTH_START`.
pub const CONNECTION_TYPE_MANAGER: &str = "MANAGER";

/// Highest client-originated sequence number (0x3FFF); the counter wraps to 1 after it.
pub const MAX_CLIENT_COMMAND: u16 = 16383;

/// Characters that delimit the request line and may not appear in a parameter value.
pub const RESERVED_CHARS: [char; 4] = ['|', '=', '\r', '\n'];

/// Cipher method requested during `AUTH_START`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CryptMethod {
    /// Plain traffic.
    #[default]
    None,
    /// AES-256 in OFB mode, keyed from `CRYPT_RAND` and the password.
    Aes256Ofb,
}

impl CryptMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CryptMethod::None => "NONE",
            CryptMethod::Aes256Ofb => "AES256OFB",
        }
    }
}

/// Commands the engine and the session facade issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Begin of authorization.
    AuthStart,
    /// End of authorization.
    AuthAnswer,
    UserAdd,
    UserUpdate,
    UserPassChange,
    TradeBalance,
    SymbolAdd,
    Ping,
    Quit,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::AuthStart => "AUTH_START",
            Command::AuthAnswer => "AUTH_ANSWER",
            Command::UserAdd => "USER_ADD",
            Command::UserUpdate => "USER_UPDATE",
            Command::UserPassChange => "USER_PASS_CHANGE",
            Command::TradeBalance => "TRADE_BALANCE",
            Command::SymbolAdd => "SYMBOL_ADD",
            Command::Ping => "PING",
            Command::Quit => "QUIT",
        }
    }

    /// Handshake commands always travel in clear, before a cipher is agreed.
    pub fn is_handshake(self) -> bool {
        matches!(self, Command::AuthStart | Command::AuthAnswer)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request and answer field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Version,
    RetCode,
    Login,
    Type,
    Agent,
    SrvRand,
    SrvRandAnswer,
    CliRand,
    CliRandAnswer,
    Time,
    Total,
    Index,
    Group,
    Symbol,
    Name,
    Company,
    Language,
    Country,
    City,
    State,
    ZipCode,
    Address,
    Phone,
    Email,
    Id,
    Status,
    Comment,
    Color,
    PassMain,
    PassInvestor,
    PassApi,
    PassPhone,
    Leverage,
    Rights,
    Balance,
    Password,
    Ticket,
    Offset,
    From,
    To,
    TransId,
    Subject,
    Category,
    Priority,
    /// Raw payload appended after the key=value line; never escaped.
    BodyText,
    CheckMargin,
    CryptMethod,
    CryptRand,
}

impl Param {
    pub fn as_str(self) -> &'static str {
        match self {
            Param::Version => "VERSION",
            Param::RetCode => "RETCODE",
            Param::Login => "LOGIN",
            Param::Type => "TYPE",
            Param::Agent => "AGENT",
            Param::SrvRand => "SRV_RAND",
            Param::SrvRandAnswer => "SRV_RAND_ANSWER",
            Param::CliRand => "CLI_RAND",
            Param::CliRandAnswer => "CLI_RAND_ANSWER",
            Param::Time => "TIME",
            Param::Total => "TOTAL",
            Param::Index => "INDEX",
            Param::Group => "GROUP",
            Param::Symbol => "SYMBOL",
            Param::Name => "NAME",
            Param::Company => "COMPANY",
            Param::Language => "LANGUAGE",
            Param::Country => "COUNTRY",
            Param::City => "CITY",
            Param::State => "STATE",
            Param::ZipCode => "ZIPCODE",
            Param::Address => "ADDRESS",
            Param::Phone => "PHONE",
            Param::Email => "EMAIL",
            Param::Id => "ID",
            Param::Status => "STATUS",
            Param::Comment => "COMMENT",
            Param::Color => "COLOR",
            Param::PassMain => "PASS_MAIN",
            Param::PassInvestor => "PASS_INVESTOR",
            Param::PassApi => "PASS_API",
            Param::PassPhone => "PASS_PHONE",
            Param::Leverage => "LEVERAGE",
            Param::Rights => "RIGHTS",
            Param::Balance => "BALANCE",
            Param::Password => "PASSWORD",
            Param::Ticket => "TICKET",
            Param::Offset => "OFFSET",
            Param::From => "FROM",
            Param::To => "TO",
            Param::TransId => "TRANS_ID",
            Param::Subject => "SUBJECT",
            Param::Category => "CATEGORY",
            Param::Priority => "PRIORITY",
            Param::BodyText => "BODY_TEXT",
            Param::CheckMargin => "CHECK_MARGIN",
            Param::CryptMethod => "CRYPT_METHOD",
            Param::CryptRand => "CRYPT_RAND",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered request parameters.
///
/// Fields are written in insertion order. Setting a field twice replaces the
/// earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    entries: Vec<(Param, String)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`RequestParams::set`].
    pub fn with(mut self, param: Param, value: impl Into<String>) -> Self {
        self.set(param, value);
        self
    }

    pub fn set(&mut self, param: Param, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(p, _)| *p == param) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((param, value)),
        }
    }

    pub fn get(&self, param: Param) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Param, &str)> {
        self.entries.iter().map(|(p, v)| (*p, v.as_str()))
    }
}

impl FromIterator<(Param, String)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (Param, String)>>(iter: I) -> Self {
        let mut params = RequestParams::new();
        for (param, value) in iter {
            params.set(param, value);
        }
        params
    }
}
