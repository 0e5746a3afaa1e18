//! Error types for the guide client
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using GuideError
pub type Result<T> = std::result::Result<T, GuideError>;

/// Unified error type for guide client operations
#[derive(Debug, Error)]
pub enum GuideError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Not connected: connect to a server first")]
    NotConnected,

    #[error("Request timed out after {timeout_ms} ms; connection closed, reconnect required")]
    Timeout { timeout_ms: u64 },

    #[error("Failed to connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Handshake failed: {0}")]
    Handshake(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    // -------------------------------------------------------------------------
    // Queue Errors
    // -------------------------------------------------------------------------
    #[error("Measurement queue is empty")]
    EmptyQueue,

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Invalid measurement record: {0}")]
    Record(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
