//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use mt5_webapi::config::{
    ClientConfig, LoggingConfig, StalePacketPolicy, TransportConfig, WebApiConfig,
};
use mt5_webapi::error::ProtocolError;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = WebApiConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_empty_host() {
    let mut config = WebApiConfig::default();
    config.client.host = "  ".to_string();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("host cannot be empty")));
}

#[test]
fn test_zero_port() {
    let mut config = WebApiConfig::default();
    config.client.port = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("port must be greater than 0")));
}

#[test]
fn test_short_connection_timeout() {
    let mut config = WebApiConfig::default();
    config.client.connection_timeout = Duration::from_millis(50);

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Connection timeout too short")));
}

#[test]
fn test_long_connection_timeout() {
    let mut config = WebApiConfig::default();
    config.client.connection_timeout = Duration::from_secs(400);

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Connection timeout too long")));
}

#[test]
fn test_short_operation_timeout() {
    let mut config = WebApiConfig::default();
    config.client.operation_timeout = Duration::from_millis(1);

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Operation timeout too short")));
}

#[test]
fn test_agent_with_delimiter() {
    let mut config = WebApiConfig::default();
    config.client.agent = "crm|v2".to_string();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("reserved character")));
}

#[test]
fn test_encryption_enabled_warning() {
    let mut config = WebApiConfig::default();
    config.client.encryption_enabled = true;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Packet encryption is not supported")));
}

#[test]
fn test_tiny_read_buffer() {
    let mut config = WebApiConfig::default();
    config.transport.read_buffer_size = 8;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Read buffer size too small")));
}

#[test]
fn test_excessive_read_buffer() {
    let mut config = WebApiConfig::default();
    config.transport.read_buffer_size = 64 * 1024 * 1024;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Read buffer size too large")));
}

#[test]
fn test_empty_app_name() {
    let mut config = WebApiConfig::default();
    config.logging.app_name = String::new();

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Application name cannot be empty")));
}

#[test]
fn test_log_to_file_without_path() {
    let mut config = WebApiConfig::default();
    config.logging.log_to_file = true;
    config.logging.log_file_path = None;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("log_file_path must be specified")));
}

#[test]
fn test_no_logging_outputs() {
    let mut config = WebApiConfig::default();
    config.logging.log_to_console = false;
    config.logging.log_to_file = false;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("At least one logging output")));
}

#[test]
fn test_validate_strict_with_invalid_config() {
    let mut config = WebApiConfig::default();
    config.client.host = String::new();

    match config.validate_strict() {
        Err(ProtocolError::ConfigError(message)) => {
            assert!(message.contains("Configuration validation failed"));
        }
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn test_multiple_validation_errors() {
    let mut config = WebApiConfig::default();
    config.client.host = String::new();
    config.client.port = 0;
    config.client.agent = String::new();
    config.transport.read_buffer_size = 0;
    config.logging.app_name = String::new();

    let errors = config.validate();
    assert!(
        errors.len() >= 5,
        "Expected at least 5 errors, got {}: {:?}",
        errors.len(),
        errors
    );
}

#[test]
fn test_toml_round_trip_through_file() {
    let config = WebApiConfig {
        client: ClientConfig {
            host: "10.0.0.5".to_string(),
            port: 8443,
            connection_timeout: Duration::from_secs(3),
            operation_timeout: Duration::from_secs(15),
            agent: "Backoffice".to_string(),
            encryption_enabled: false,
        },
        transport: TransportConfig {
            read_buffer_size: 8192,
            stale_packet_policy: StalePacketPolicy::Reject,
            ..TransportConfig::default()
        },
        logging: LoggingConfig {
            app_name: "backoffice".to_string(),
            log_level: Level::DEBUG,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: true,
        },
    };

    let path = std::env::temp_dir().join(format!("mt5-webapi-config-{}.toml", std::process::id()));
    config.save_to_file(&path).unwrap();
    let loaded = WebApiConfig::from_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.client.host, "10.0.0.5");
    assert_eq!(loaded.client.operation_timeout, Duration::from_secs(15));
    assert_eq!(loaded.transport.stale_packet_policy, StalePacketPolicy::Reject);
    assert_eq!(loaded.logging.log_level, Level::DEBUG);
    assert!(loaded.logging.json_format);
}

#[test]
fn test_invalid_toml_is_config_error() {
    assert!(matches!(
        WebApiConfig::from_toml("[client]\nport = \"not a number\""),
        Err(ProtocolError::ConfigError(_))
    ));
    assert!(matches!(
        WebApiConfig::from_toml("[logging]\nlog_level = \"loud\""),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_missing_file() {
    assert!(WebApiConfig::from_file("/nonexistent/webapi.toml").is_err());
}

// The only test in this binary that touches the process environment.
#[test]
fn test_from_env_overrides() {
    std::env::set_var("MT5_WEBAPI_HOST", "mt5.internal");
    std::env::set_var("MT5_WEBAPI_PORT", "9443");
    std::env::set_var("MT5_WEBAPI_OPERATION_TIMEOUT_MS", "2500");
    std::env::set_var("MT5_WEBAPI_STALE_PACKET_POLICY", "REJECT");

    let config = WebApiConfig::from_env().unwrap();
    assert_eq!(config.client.host, "mt5.internal");
    assert_eq!(config.client.port, 9443);
    assert_eq!(config.client.operation_timeout, Duration::from_millis(2500));
    assert_eq!(config.transport.stale_packet_policy, StalePacketPolicy::Reject);

    std::env::set_var("MT5_WEBAPI_PORT", "not-a-port");
    assert!(WebApiConfig::from_env().is_err());

    for name in [
        "MT5_WEBAPI_HOST",
        "MT5_WEBAPI_PORT",
        "MT5_WEBAPI_OPERATION_TIMEOUT_MS",
        "MT5_WEBAPI_STALE_PACKET_POLICY",
    ] {
        std::env::remove_var(name);
    }
}

#[test]
fn test_answer_limit_below_one_frame() {
    let mut config = WebApiConfig::default();
    config.transport.max_answer_size = 4096;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Max answer size too small")));
}
