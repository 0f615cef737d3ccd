//! Error types for the WebSocket transport.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wamp_ws_transport::{Result, WebSocketTransport};
//!
//! async fn example(transport: &WebSocketTransport<TungsteniteEngine>) -> Result<()> {
//!     transport.connect("ws://127.0.0.1:8080/ws").await?;
//!     transport.write(b"\x93\x01\xa3abc")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUri`] |
//! | Connect attempt | [`Error::Connect`] (carries a [`ConnectFailure`]) |
//! | Connection | [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Misuse | [`Error::InvalidState`], [`Error::UnknownConnection`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ConnectionHandle;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// ConnectFailure
// ============================================================================

/// Outcome carried by a failed connect attempt.
///
/// Cloneable so every clone of a [`ConnectFuture`](crate::ConnectFuture)
/// observes the same failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The engine rejected the connection object before any I/O started.
    #[error("Connection setup failed: {message}")]
    Setup {
        /// Description of the setup failure.
        message: String,
    },

    /// The engine reported a failure before the connection opened.
    #[error("Connection failed: {message}")]
    Failed {
        /// Engine-provided failure description.
        message: String,
    },

    /// The attempt was abandoned before the engine reported an outcome.
    #[error("Connect attempt cancelled")]
    Cancelled,

    /// A connect attempt was already issued on this transport.
    #[error("Connect already attempted on this transport")]
    AlreadyStarted,
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when transport or engine configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Malformed or unsupported connection URI.
    #[error("Invalid URI '{uri}': {message}")]
    InvalidUri {
        /// The rejected URI.
        uri: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connect attempt did not succeed.
    #[error(transparent)]
    Connect(#[from] ConnectFailure),

    /// Opening handshake did not finish in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection closed before the operation could run.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Misuse Errors
    // ========================================================================
    /// Operation is not valid in the connection's current state.
    ///
    /// Returned for writes before open or after the terminal state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state violation.
        message: String,
    },

    /// The engine has no connection for this handle.
    #[error("Unknown connection: {handle}")]
    UnknownConnection {
        /// The handle that was looked up.
        handle: ConnectionHandle,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON (configuration) error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URI error.
    #[inline]
    pub fn invalid_uri(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Creates a connection setup failure.
    #[inline]
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Connect(ConnectFailure::Setup {
            message: message.into(),
        })
    }

    /// Creates a connect failure.
    #[inline]
    pub fn connect_failed(message: impl Into<String>) -> Self {
        Self::Connect(ConnectFailure::Failed {
            message: message.into(),
        })
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an unknown connection error.
    #[inline]
    pub fn unknown_connection(handle: ConnectionHandle) -> Self {
        Self::UnknownConnection { handle }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if the failure happened before any I/O started.
    #[inline]
    #[must_use]
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUri { .. } | Self::Connect(ConnectFailure::Setup { .. })
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect(_)
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns the connect failure, if this error carries one.
    #[inline]
    #[must_use]
    pub fn connect_failure(&self) -> Option<&ConnectFailure> {
        match self {
            Self::Connect(failure) => Some(failure),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connect_failed("connection refused");
        assert_eq!(err.to_string(), "Connection failed: connection refused");
    }

    #[test]
    fn test_invalid_uri_display() {
        let err = Error::invalid_uri("ftp://host", "unsupported scheme");
        assert_eq!(
            err.to_string(),
            "Invalid URI 'ftp://host': unsupported scheme"
        );
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::connection_timeout(5000);
        let other_err = Error::connect_failed("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_setup_error() {
        assert!(Error::setup("bad header").is_setup_error());
        assert!(Error::invalid_uri("x", "y").is_setup_error());
        assert!(!Error::connect_failed("refused").is_setup_error());
        assert!(!Error::Connect(ConnectFailure::Cancelled).is_setup_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connect_failed("test").is_connection_error());
        assert!(Error::connection_timeout(1000).is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
        assert!(!Error::invalid_state("test").is_connection_error());
    }

    #[test]
    fn test_connect_failure_accessor() {
        let err = Error::from(ConnectFailure::AlreadyStarted);
        assert_eq!(err.connect_failure(), Some(&ConnectFailure::AlreadyStarted));
        assert!(Error::ConnectionClosed.connect_failure().is_none());
    }

    #[test]
    fn test_unknown_connection_display() {
        let err = Error::unknown_connection(ConnectionHandle::new(7));
        assert_eq!(err.to_string(), "Unknown connection: conn-7");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
