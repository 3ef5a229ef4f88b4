//! Tests for the client configuration module

use super::*;

#[test]
fn test_default_config_values() {
    let config = SyncClientConfig::default();

    assert_eq!(config.reconnect.base_delay_ms, 1000);
    assert_eq!(config.reconnect.max_delay_ms, 30000);
    assert_eq!(config.reconnect.max_attempts, 5);
    assert!(!config.reconnect.jitter_enabled);
    assert_eq!(config.polling.interval_seconds, 10);
    assert_eq!(config.probe.timeout_seconds, 5);
}

#[test]
fn test_default_config_validates() {
    assert!(SyncClientConfig::default().validate().is_ok());
}

#[test]
fn test_zero_base_delay_rejected() {
    let mut config = SyncClientConfig::default();
    config.reconnect.base_delay_ms = 0;

    let error = config.validate().unwrap_err();
    assert!(matches!(
        error,
        ValidationError::OutOfRange { ref field, .. } if field == "reconnect.base_delay_ms"
    ));
}

#[test]
fn test_max_delay_below_base_rejected() {
    let mut config = SyncClientConfig::default();
    config.reconnect.base_delay_ms = 5000;
    config.reconnect.max_delay_ms = 1000;

    let error = config.validate().unwrap_err();
    assert!(matches!(
        error,
        ValidationError::OutOfRange { ref field, .. } if field == "reconnect.max_delay_ms"
    ));
}

#[test]
fn test_zero_max_attempts_rejected() {
    let mut config = SyncClientConfig::default();
    config.reconnect.max_attempts = 0;

    assert!(config.validate().is_err());
}

#[test]
fn test_zero_polling_interval_rejected() {
    let mut config = SyncClientConfig::default();
    config.polling.interval_seconds = 0;

    let error = config.validate().unwrap_err();
    assert!(matches!(
        error,
        ValidationError::OutOfRange { ref field, .. } if field == "polling.interval_seconds"
    ));
}

#[test]
fn test_zero_probe_timeout_rejected() {
    let mut config = SyncClientConfig::default();
    config.probe.timeout_seconds = 0;

    assert!(config.validate().is_err());
}

#[test]
fn test_config_serde_round_trip() {
    let config = SyncClientConfig::default();

    let json = serde_json::to_string(&config).unwrap();
    let parsed: SyncClientConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, config);
}
