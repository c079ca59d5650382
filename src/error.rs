//! Error types for ragstream
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for ragstream operations
///
/// Covers configuration loading, HTTP streaming against the inference
/// backends, and the telemetry WebSocket feed.
#[derive(Error, Debug)]
pub enum RagstreamError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {reason}")]
    HttpStatus {
        /// Numeric HTTP status code
        status: u16,
        /// Canonical reason phrase for the status
        reason: String,
    },

    /// Request could not be sent or the response body broke mid-stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// Telemetry feed errors (connect, send, receive)
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket protocol errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result type alias for ragstream operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = RagstreamError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_http_status_error_display() {
        let error = RagstreamError::HttpStatus {
            status: 502,
            reason: "Bad Gateway".to_string(),
        };
        assert_eq!(error.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_transport_error_display() {
        let error = RagstreamError::Transport("connection reset".to_string());
        assert_eq!(error.to_string(), "Transport error: connection reset");
    }

    #[test]
    fn test_telemetry_error_display() {
        let error = RagstreamError::Telemetry("socket closed".to_string());
        assert_eq!(error.to_string(), "Telemetry error: socket closed");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: RagstreamError = io_error.into();
        assert!(matches!(error, RagstreamError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: RagstreamError = json_error.into();
        assert!(matches!(error, RagstreamError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: RagstreamError = yaml_error.into();
        assert!(matches!(error, RagstreamError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RagstreamError>();
    }
}
