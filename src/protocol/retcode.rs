//! Server return codes.
//!
//! Every answer carries a `RETCODE` field. The table below is the closed set
//! of codes the server defines, each with its fixed message. Codes are grouped
//! in bands (auth errors in the 1000s, user management in the 3000s, trade
//! requests in the 10000s and so on); the engine only surfaces them and leaves
//! retry policy to the caller.

use crate::error::{ProtocolError, Result};
use std::fmt;

/// Message returned for codes outside the table.
pub const UNKNOWN_ERROR: &str = "unknown error";

macro_rules! retcodes {
    ($( $(#[$doc:meta])* $name:ident = $code:literal => $msg:literal, )*) => {
        /// A return code from the server's fixed enumeration.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum RetCode {
            $( $(#[$doc])* $name, )*
            /// A numeric code the table does not define.
            Unknown(u32),
        }

        impl RetCode {
            /// Every defined code, in table order. [`RetCode::Unknown`] is not listed.
            pub const ALL: &'static [RetCode] = &[$( RetCode::$name, )*];

            /// Numeric value sent on the wire.
            pub const fn code(self) -> u32 {
                match self {
                    $( RetCode::$name => $code, )*
                    RetCode::Unknown(code) => code,
                }
            }

            /// Fixed human-readable message.
            pub const fn message(self) -> &'static str {
                match self {
                    $( RetCode::$name => $msg, )*
                    RetCode::Unknown(_) => UNKNOWN_ERROR,
                }
            }

            /// Look a numeric value up in the table.
            pub const fn from_code(code: u32) -> Option<RetCode> {
                match code {
                    $( $code => Some(RetCode::$name), )*
                    _ => None,
                }
            }
        }
    };
}

retcodes! {
    // success
    Ok = 0 => "ok",
    OkNone = 1 => "ok no data",

    // common errors
    Error = 2 => "Common error",
    ErrParams = 3 => "Invalid parameters",
    ErrData = 4 => "Invalid data",
    ErrDisk = 5 => "Disk error",
    ErrMem = 6 => "Memory error",
    ErrNetwork = 7 => "Network error",
    ErrPermissions = 8 => "Not enough permissions",
    ErrTimeout = 9 => "Operation timeout",
    ErrConnection = 10 => "No connection",
    ErrNoService = 11 => "Service is not available",
    ErrFrequent = 12 => "Too frequent requests",
    ErrNotFound = 13 => "Not found",
    ErrPartial = 14 => "Partial error",
    ErrShutdown = 15 => "Server shutdown in progress",
    ErrCancel = 16 => "Operation has been canceled",
    ErrDuplicate = 17 => "Duplicate data",

    // authentication
    AuthClientInvalid = 1000 => "Invalid terminal type",
    AuthAccountInvalid = 1001 => "Invalid account",
    AuthAccountDisabled = 1002 => "Account disabled",
    AuthAdvanced = 1003 => "Advanced authorization necessary",
    AuthCertificate = 1004 => "Certificate required",
    AuthCertificateBad = 1005 => "Invalid certificate",
    AuthNotConfirmed = 1006 => "Certificate is not confirmed",
    AuthServerInternal = 1007 => "Attempt to connect to non-access server",
    AuthServerBad = 1008 => "Server is not authenticated",
    AuthUpdateOnly = 1009 => "Only updates available",
    AuthClientOld = 1010 => "Client has old version",
    AuthManagerNoConfig = 1011 => "Manager account does not have manager config",
    AuthManagerIpBlock = 1012 => "IP address unallowed for manager",
    AuthGroupInvalid = 1013 => "Group is not initialized (server restart neccesary)",
    AuthCaDisabled = 1014 => "Certificate generation disabled",
    AuthInvalidId = 1015 => "Invalid or disabled server id [check server's id]",
    AuthInvalidIp = 1016 => "Unallowed address [check server's ip address]",
    AuthInvalidType = 1017 => "Invalid server type [check server's id and type]",
    AuthServerBusy = 1018 => "Server is busy",
    AuthServerCert = 1019 => "Invalid server certificate",
    AuthAccountUnknown = 1020 => "Unknown account",
    AuthServerOld = 1021 => "Old server version",
    AuthServerLimit = 1022 => "Server cannot be connected due to license limitation",
    AuthMobileDisabled = 1023 => "Mobile connection aren't allowed in server license",

    // config management
    CfgLastAdmin = 2000 => "Last admin config deleting",
    CfgLastAdminGroup = 2001 => "Last admin group cannot be deleted",
    CfgNotEmpty = 2003 => "Accounts or trades in group",
    CfgInvalidRange = 2004 => "Invalid accounts or trades ranges",
    CfgNotManagerLogin = 2005 => "Manager account is not from manager group",
    CfgBuiltin = 2006 => "Built-in protected config",
    CfgDuplicate = 2007 => "Configuration duplicate",
    CfgLimitReached = 2008 => "Configuration limit reached",
    CfgNoAccessToMain = 2009 => "Invalid network configuration",
    CfgDealerIdExist = 2010 => "Dealer with same ID exists",
    CfgBindAddrExist = 2011 => "Bind address already exists",
    CfgWorkingTrade = 2012 => "Attempt to delete working trade server",

    // user management
    UsrLastAdmin = 3001 => "Last admin account deleting",
    UsrLoginExhausted = 3002 => "Logins range exhausted",
    UsrLoginProhibited = 3003 => "Login reserved at another server",
    UsrLoginExist = 3004 => "Account already exists",
    UsrSuicide = 3005 => "Attempt of self-deletion",
    UsrInvalidPassword = 3006 => "Invalid account password",
    UsrLimitReached = 3007 => "Users limit reached",
    UsrHasTrades = 3008 => "Account has open trades",
    UsrDifferentServers = 3009 => "Attempt to move account to different server",
    UsrDifferentCurrency = 3010 => "Attempt to move account to different currency group",
    UsrImportBalance = 3011 => "Account balance import error",
    UsrImportGroup = 3012 => "Account import with invalid group",

    // trade management
    TradeLimitReached = 4001 => "Orders or deals limit reached",
    TradeOrderExist = 4002 => "Order already exists",
    TradeOrderExhausted = 4003 => "Orders range exhausted",
    TradeDealExhausted = 4004 => "Deals range exhausted",
    TradeMaxMoney = 4005 => "Money limit reached",

    // report generation
    ReportSnapshot = 5001 => "Base snapshot error",
    ReportNotSupported = 5002 => "Method doesn't support for this report",
    ReportNoData = 5003 => "No report data",
    ReportTemplateBad = 5004 => "Bad template",
    ReportTemplateEnd = 5005 => "End of template (template success processed)",
    ReportInvalidRow = 5006 => "Invalid row size",
    ReportLimitRepeat = 5007 => "Tag repeat limit reached",
    ReportLimitReport = 5008 => "Report size limit reached",

    // price history
    HstSymbolNotFound = 6001 => "Symbol not found try to restart history server",

    // trade request lifecycle
    RequestInWay = 10001 => "Request on the way",
    RequestAccepted = 10002 => "Request accepted",
    RequestProcess = 10003 => "Request processed",
    RequestRequote = 10004 => "Request Requoted",
    RequestPrices = 10005 => "Request Prices",
    RequestReject = 10006 => "Request rejected",
    RequestCancel = 10007 => "Request canceled",
    RequestPlaced = 10008 => "Order from requestplaced",
    RequestDone = 10009 => "Request executed",
    RequestDonePartial = 10010 => "Request executed partially",
    RequestError = 10011 => "Request common error",
    RequestTimeout = 10012 => "Request timeout",
    RequestInvalid = 10013 => "Invalid request",
    RequestInvalidVolume = 10014 => "Invalid volume",
    RequestInvalidPrice = 10015 => "Invalid price",
    RequestInvalidStops = 10016 => "Invalid stops or price",
    RequestTradeDisabled = 10017 => "Trade disabled",
    RequestMarketClosed = 10018 => "Market closed",
    RequestNoMoney = 10019 => "Not enough money",
    RequestPriceChanged = 10020 => "Price changed",
    RequestPriceOff = 10021 => "No prices",
    RequestInvalidExp = 10022 => "Invalid order expiration",
    RequestOrderChanged = 10023 => "Order has been changed already",
    RequestTooMany = 10024 => "Too many trade requests",
    RequestNoChanges = 10025 => "Request doesn't contain changes",
    RequestAtDisabledServer = 10026 => "AutoTrading disabled by server",
    RequestAtDisabledClient = 10027 => "AutoTrading disabled by client",
    RequestLocked = 10028 => "Request locked by dealer",
    RequestFrozen = 10029 => "Order or position frozen",
    RequestInvalidFill = 10030 => "Unsupported filling mode",
    RequestConnection = 10031 => "No connection",
    RequestOnlyReal = 10032 => "Allowed for real accounts only",
    RequestLimitOrders = 10033 => "Orders limit reached",
    RequestLimitVolume = 10034 => "Volume limit reached",

    // dealer
    RequestReturn = 11000 => "Request returned in queue",
    RequestDoneCancel = 11001 => "Request partially filled remainder has been canceled",
    RequestRequoteReturn = 11002 => "Request requoted and returned in queue with new prices",

    // API
    ErrNotImplemented = 12000 => "Not implement yet",
    ErrNotMain = 12001 => "Operation must be performed on main server",
    ErrNotSupported = 12002 => "Command doesn't supported",
    ErrDeadlock = 12003 => "Operation canceled due possible deadlock",
    ErrLocked = 12004 => "Operation on locked entity",
}

impl RetCode {
    /// Codes 0 and 1 are the only successful outcomes.
    pub fn is_success(self) -> bool {
        matches!(self, RetCode::Ok | RetCode::OkNone)
    }

    /// Turn a success code into `Ok(())` and anything else into an error.
    pub fn into_result(self) -> Result<()> {
        if self == RetCode::Ok {
            Ok(())
        } else {
            Err(ProtocolError::RetCode(self))
        }
    }
}

impl fmt::Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.message())
    }
}

/// Message for any numeric code, including ones the table does not know.
pub fn retcode_message(code: Option<u32>) -> &'static str {
    code.and_then(RetCode::from_code)
        .map(RetCode::message)
        .unwrap_or(UNKNOWN_ERROR)
}

/// Parse the `RETCODE` field of an answer.
///
/// The server sends the number followed by its message, e.g. `"0 Done"`;
/// only the leading token is significant. A number missing from the table is
/// kept as [`RetCode::Unknown`]; only a non-numeric token is a data error.
pub fn parse_retcode(value: &str) -> Result<RetCode> {
    let token = value.split_whitespace().next().unwrap_or("");
    let code: u32 = token
        .parse()
        .map_err(|_| ProtocolError::MalformedRetCode(value.to_string()))?;
    Ok(RetCode::from_code(code).unwrap_or(RetCode::Unknown(code)))
}
