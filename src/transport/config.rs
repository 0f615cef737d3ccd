//! Transport configuration.
//!
//! # Example
//!
//! ```ignore
//! use wamp_ws_transport::TransportConfig;
//!
//! let config = TransportConfig::new().with_subprotocol("wamp.2.json");
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Subprotocol advertised for the WAMP MessagePack serialization.
pub const WAMP_MSGPACK_SUBPROTOCOL: &str = "wamp.2.msgpack";

/// Reason string sent with a normal-status close.
pub const DISCONNECT_REASON: &str = "wamp closing";

// ============================================================================
// TransportConfig
// ============================================================================

/// Fixed strings a transport advertises on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Subprotocol offered during the opening handshake.
    pub subprotocol: String,

    /// Reason string sent by [`close`](crate::WebSocketTransport::close).
    pub close_reason: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            subprotocol: WAMP_MSGPACK_SUBPROTOCOL.to_string(),
            close_reason: DISCONNECT_REASON.to_string(),
        }
    }
}

impl TransportConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed
    /// - [`Error::Config`] if a value is invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the advertised subprotocol.
    #[inline]
    #[must_use]
    pub fn with_subprotocol(mut self, subprotocol: impl Into<String>) -> Self {
        self.subprotocol = subprotocol.into();
        self
    }

    /// Sets the close reason string.
    #[inline]
    #[must_use]
    pub fn with_close_reason(mut self, reason: impl Into<String>) -> Self {
        self.close_reason = reason.into();
        self
    }

    /// Checks that all values are usable.
    ///
    /// Close reasons are limited to 123 bytes by RFC 6455.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.subprotocol.is_empty() {
            return Err(Error::config("subprotocol must not be empty"));
        }
        if self
            .subprotocol
            .chars()
            .any(|c| c.is_whitespace() || c == ',' || c.is_control())
        {
            return Err(Error::config(format!(
                "subprotocol '{}' is not a valid token",
                self.subprotocol
            )));
        }
        if self.close_reason.len() > 123 {
            return Err(Error::config("close_reason exceeds 123 bytes"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
