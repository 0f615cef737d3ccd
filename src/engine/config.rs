//! Networking engine configuration.
//!
//! # Example
//!
//! ```ignore
//! use wamp_ws_transport::EngineConfig;
//!
//! let config = EngineConfig::new()
//!     .with_connect_timeout_ms(5_000)
//!     .with_max_message_size(Some(1 << 20));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default opening-handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;

/// Default wait for the peer to answer a close frame.
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 5_000;

/// Default maximum size of one inbound message (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 << 20;

/// Default maximum size of one inbound frame (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 << 20;

/// Default name of the engine's I/O thread.
pub const DEFAULT_THREAD_NAME: &str = "wamp-ws-io";

// ============================================================================
// EngineConfig
// ============================================================================

/// Configuration for [`TungsteniteEngine`](super::TungsteniteEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Milliseconds allowed for TCP connect plus the opening handshake.
    pub connect_timeout_ms: u64,

    /// Milliseconds to wait for the peer's close reply before dropping the
    /// socket.
    pub close_timeout_ms: u64,

    /// Maximum inbound message size. `None` disables the limit.
    pub max_message_size: Option<usize>,

    /// Maximum inbound frame size. `None` disables the limit.
    pub max_frame_size: Option<usize>,

    /// Name given to the dedicated I/O thread.
    pub thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
            max_message_size: Some(DEFAULT_MAX_MESSAGE_SIZE),
            max_frame_size: Some(DEFAULT_MAX_FRAME_SIZE),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl EngineConfig {
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
    /// - [`Error::Config`] if a value is out of range
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl EngineConfig {
    /// Sets the opening-handshake timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Sets the close-handshake timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn with_close_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.close_timeout_ms = timeout_ms;
        self
    }

    /// Sets the maximum inbound message size.
    #[inline]
    #[must_use]
    pub fn with_max_message_size(mut self, size: Option<usize>) -> Self {
        self.max_message_size = size;
        self
    }

    /// Sets the maximum inbound frame size.
    #[inline]
    #[must_use]
    pub fn with_max_frame_size(mut self, size: Option<usize>) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets the I/O thread name.
    #[inline]
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl EngineConfig {
    /// Returns the opening-handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the close-handshake timeout.
    #[inline]
    #[must_use]
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Checks that all values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(Error::config("connect_timeout_ms must be greater than 0"));
        }
        if self.close_timeout_ms == 0 {
            return Err(Error::config("close_timeout_ms must be greater than 0"));
        }
        if self.thread_name.trim().is_empty() {
            return Err(Error::config("thread_name must not be empty"));
        }
        if let (Some(message), Some(frame)) = (self.max_message_size, self.max_frame_size)
            && frame > message
        {
            return Err(Error::config(format!(
                "max_frame_size ({frame}) exceeds max_message_size ({message})"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.close_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_message_size, Some(DEFAULT_MAX_MESSAGE_SIZE));
        assert_eq!(config.thread_name, "wamp-ws-io");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = EngineConfig::new()
            .with_connect_timeout_ms(250)
            .with_close_timeout_ms(100)
            .with_max_message_size(None)
            .with_max_frame_size(Some(1024))
            .with_thread_name("io");

        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.close_timeout(), Duration::from_millis(100));
        assert_eq!(config.max_message_size, None);
        assert_eq!(config.max_frame_size, Some(1024));
        assert_eq!(config.thread_name, "io");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let err = EngineConfig::new()
            .with_connect_timeout_ms(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_close_timeout() {
        let err = EngineConfig::new()
            .with_close_timeout_ms(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("close_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_frame_larger_than_message() {
        let config = EngineConfig::new()
            .with_max_message_size(Some(10))
            .with_max_frame_size(Some(20));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = EngineConfig::from_json(r#"{ "connect_timeout_ms": 1500 }"#).unwrap();
        assert_eq!(config.connect_timeout_ms, 1500);
        assert_eq!(config.close_timeout_ms, DEFAULT_CLOSE_TIMEOUT_MS);
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn test_from_json_rejects_empty_thread_name() {
        assert!(EngineConfig::from_json(r#"{ "thread_name": " " }"#).is_err());
    }
}
