//! # Configuration Management
//!
//! Centralized configuration for the Web API client.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Environment variables via `from_env()` (prefix `MT5_WEBAPI_`)
//! - Direct instantiation with defaults
//!
//! Credentials are not part of the configuration; they are passed to
//! [`Session::connect`](crate::service::session::Session::connect) directly.

use crate::error::{ProtocolError, Result};
use crate::protocol::consts::{RESERVED_CHARS, WEB_API_WORD};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default Web API port
pub const DEFAULT_PORT: u16 = 443;

/// Size of a single bounded read from the socket
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Largest answer body kept across continuation frames
pub const DEFAULT_MAX_ANSWER_SIZE: usize = 16 * 1024 * 1024;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WebApiConfig {
    /// Connection settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Framing and reassembly settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WebApiConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults. A variable that is set but cannot
    /// be parsed is reported as a [`ProtocolError::ConfigError`].
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("MT5_WEBAPI_HOST") {
            config.client.host = host;
        }

        if let Some(port) = env_parse::<u16>("MT5_WEBAPI_PORT")? {
            config.client.port = port;
        }

        if let Some(ms) = env_parse::<u64>("MT5_WEBAPI_CONNECTION_TIMEOUT_MS")? {
            config.client.connection_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = env_parse::<u64>("MT5_WEBAPI_OPERATION_TIMEOUT_MS")? {
            config.client.operation_timeout = Duration::from_millis(ms);
        }

        if let Ok(agent) = std::env::var("MT5_WEBAPI_AGENT") {
            config.client.agent = agent;
        }

        if let Some(enabled) = env_parse::<bool>("MT5_WEBAPI_ENCRYPTION")? {
            config.client.encryption_enabled = enabled;
        }

        if let Some(bytes) = env_parse::<usize>("MT5_WEBAPI_MAX_ANSWER_SIZE")? {
            config.transport.max_answer_size = bytes;
        }

        if let Ok(policy) = std::env::var("MT5_WEBAPI_STALE_PACKET_POLICY") {
            config.transport.stale_packet_policy = match policy.to_ascii_lowercase().as_str() {
                "discard" => StalePacketPolicy::Discard,
                "reject" => StalePacketPolicy::Reject,
                other => {
                    return Err(ProtocolError::ConfigError(format!(
                        "Invalid MT5_WEBAPI_STALE_PACKET_POLICY: {other}"
                    )))
                }
            };
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ProtocolError::ConfigError(format!("Invalid value for {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}

/// Connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Server host name or IP address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Timeout for establishing the TCP connection
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// Timeout for each send and each receive
    #[serde(with = "duration_serde")]
    pub operation_timeout: Duration,

    /// Agent identifier reported in AUTH_START
    pub agent: String,

    /// Request the AES256OFB cipher during the handshake
    pub encryption_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: DEFAULT_PORT,
            connection_timeout: timeout::DEFAULT_TIMEOUT,
            operation_timeout: timeout::DEFAULT_OPERATION_TIMEOUT,
            agent: String::from(WEB_API_WORD),
            encryption_enabled: false,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.trim().is_empty() {
            errors.push("Server host cannot be empty".to_string());
        }

        if self.port == 0 {
            errors.push("Server port must be greater than 0".to_string());
        }

        if self.connection_timeout.as_millis() < 100 {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        } else if self.connection_timeout.as_secs() > 300 {
            errors.push("Connection timeout too long (maximum: 300s)".to_string());
        }

        if self.operation_timeout.as_millis() < 10 {
            errors.push("Operation timeout too short (minimum: 10ms)".to_string());
        }

        if self.agent.is_empty() {
            errors.push("Agent identifier cannot be empty".to_string());
        } else if self.agent.contains(RESERVED_CHARS) {
            errors.push(format!(
                "Agent identifier contains a reserved character: '{}'",
                self.agent
            ));
        }

        if self.encryption_enabled {
            errors.push(
                "WARNING: Packet encryption is not supported - commands after the handshake will fail"
                    .to_string(),
            );
        }

        errors
    }

    /// `host:port` form used for logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// What to do with a non-empty packet whose sequence number does not match
/// the request that is being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePacketPolicy {
    /// Log a warning and keep reading
    #[default]
    Discard,
    /// Fail the read with `UnexpectedSequence`
    Reject,
}

/// Framing and reassembly settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Initial capacity of the read buffer
    pub read_buffer_size: usize,

    /// Handling of out-of-sequence packets that are not heartbeats
    #[serde(default)]
    pub stale_packet_policy: StalePacketPolicy,

    /// Upper bound on a reassembled answer, in body bytes
    #[serde(default = "default_max_answer_size")]
    pub max_answer_size: usize,
}

fn default_max_answer_size() -> usize {
    DEFAULT_MAX_ANSWER_SIZE
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            stale_packet_policy: StalePacketPolicy::Discard,
            max_answer_size: DEFAULT_MAX_ANSWER_SIZE,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.read_buffer_size < 16 {
            errors.push("Read buffer size too small (minimum: 16 bytes)".to_string());
        } else if self.read_buffer_size > 16 * 1024 * 1024 {
            errors.push(format!(
                "Read buffer size too large: {} bytes (maximum: 16 MB)",
                self.read_buffer_size
            ));
        }

        if self.max_answer_size < u16::MAX as usize {
            errors.push(
                "Max answer size too small (minimum: one full frame, 65535 bytes)".to_string(),
            );
        } else if self.max_answer_size > 1024 * 1024 * 1024 {
            errors.push(format!(
                "Max answer size too large: {} bytes (maximum: 1 GB)",
                self.max_answer_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("mt5-webapi"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            match self.log_file_path {
                Some(ref path) => {
                    if let Some(parent) = Path::new(path).parent() {
                        if !parent.as_os_str().is_empty() && !parent.exists() {
                            errors.push(format!(
                                "Log file directory does not exist: {}",
                                parent.display()
                            ));
                        }
                    }
                }
                None => errors
                    .push("log_file_path must be specified when log_to_file is true".to_string()),
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Durations are written as milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WebApiConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.client.agent, "WebAPI");
        assert_eq!(config.transport.stale_packet_policy, StalePacketPolicy::Discard);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = WebApiConfig::from_toml(
            r#"
            [client]
            host = "mt5.example.com"
            port = 8443
            connection_timeout = 2000
            operation_timeout = 4000
            agent = "Backoffice"
            encryption_enabled = false

            [transport]
            read_buffer_size = 4096
            stale_packet_policy = "reject"
            "#,
        )
        .unwrap();

        assert_eq!(config.client.address(), "mt5.example.com:8443");
        assert_eq!(config.client.connection_timeout, Duration::from_millis(2000));
        assert_eq!(config.transport.stale_packet_policy, StalePacketPolicy::Reject);
        assert_eq!(config.transport.max_answer_size, DEFAULT_MAX_ANSWER_SIZE);
        assert_eq!(config.logging.log_level, Level::INFO);
    }

    #[test]
    fn test_example_config_parses_back() {
        let text = WebApiConfig::example_config();
        let config = WebApiConfig::from_toml(&text).unwrap();
        assert_eq!(config.client.port, DEFAULT_PORT);
    }

    #[test]
    fn test_encryption_flag_is_reported() {
        let config = WebApiConfig::default_with_overrides(|c| c.client.encryption_enabled = true);
        assert!(config.validate_strict().is_err());
    }

    #[test]
    fn test_max_answer_size_bounds() {
        let config = WebApiConfig::default_with_overrides(|c| c.transport.max_answer_size = 1024);
        assert_eq!(config.validate().len(), 1);

        let one_frame = u16::MAX as usize;
        let config = WebApiConfig::default_with_overrides(|c| c.transport.max_answer_size = one_frame);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_reserved_characters_in_agent() {
        let config = WebApiConfig::default_with_overrides(|c| c.client.agent = "a|b".into());
        assert_eq!(config.validate().len(), 1);
    }
}
