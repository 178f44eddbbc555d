//! Error types for meetplanner-mcp.
//!
//! Protocol-level failures are not represented here: those are JSON-RPC
//! error values (see [`crate::mcp::protocol::JsonRpcErrorData`]) and are
//! returned to the client rather than propagated.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors from the single outbound call to the recommendation backend.
///
/// The `Display` output of each variant is what the client sees after the
/// `"Error: "` prefix in a tool result, so it carries no internal context.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend answered with a non-2xx status.
    #[error("{detail}")]
    Rejected {
        /// HTTP status code returned by the backend.
        status: u16,
        /// The backend's `detail` field, or a generic fallback.
        detail: String,
    },

    /// The request never produced a usable response (connect, timeout, body read).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body was not valid JSON.
    #[error("invalid response from backend: {0}")]
    InvalidBody(#[source] serde_json::Error),
}
