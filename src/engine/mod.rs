//! Callback-driven networking engine contract.
//!
//! The transport never touches sockets itself. It talks to an [`Engine`]
//! which owns the I/O event loop, performs the WebSocket handshake and
//! framing, and reports lifecycle events through an [`EngineHandler`].
//!
//! # Contract
//!
//! ```text
//! Engine::get_connection(uri) ──► PendingConnection
//!     .add_subprotocol(name)
//!     .set_handler(handler)
//! Engine::connect(pending)    ──► queued, no I/O yet
//!
//! event loop ──► on_open | on_fail          (exactly one)
//!            ──► on_message*                 (after on_open)
//!            ──► on_close | on_fail          (after on_open)
//! ```
//!
//! Callbacks for one connection are never invoked concurrently.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | [`EngineConfig`] |
//! | `tungstenite` | [`TungsteniteEngine`] built on `tokio-tungstenite` |

// ============================================================================
// Submodules
// ============================================================================

/// Engine configuration.
pub mod config;

/// `tokio-tungstenite` backed engine.
pub mod tungstenite;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionHandle;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::EngineConfig;
pub use tungstenite::TungsteniteEngine;

// ============================================================================
// OpCode
// ============================================================================

/// WebSocket frame opcode as surfaced to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// UTF-8 text frame.
    Text,
    /// Binary frame.
    Binary,
    /// Ping control frame.
    Ping,
    /// Pong control frame.
    Pong,
    /// Close control frame.
    Close,
}

// ============================================================================
// Frame
// ============================================================================

/// A complete inbound or outbound WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame opcode.
    pub opcode: OpCode,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a frame with the given opcode and payload.
    #[inline]
    #[must_use]
    pub fn new(opcode: OpCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Creates a binary frame.
    #[inline]
    #[must_use]
    pub fn binary(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(OpCode::Binary, payload)
    }

    /// Creates a text frame.
    #[inline]
    #[must_use]
    pub fn text(payload: impl Into<String>) -> Self {
        Self::new(OpCode::Text, payload.into().into_bytes())
    }

    /// Returns `true` for binary frames.
    #[inline]
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.opcode == OpCode::Binary
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// ============================================================================
// CloseCode
// ============================================================================

/// WebSocket close status code (RFC 6455 Section 7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(u16);

impl CloseCode {
    /// 1000: normal closure.
    pub const NORMAL: Self = Self(1000);
    /// 1001: endpoint going away.
    pub const GOING_AWAY: Self = Self(1001);

    /// Wraps a raw status code.
    #[inline]
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the raw status code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// EngineHandler
// ============================================================================

/// Lifecycle callbacks invoked by an engine on its own event-loop thread.
///
/// Implementations must return quickly; they run on the shared I/O loop.
pub trait EngineHandler: Send + Sync {
    /// The opening handshake completed.
    fn on_open(&self, handle: ConnectionHandle);

    /// The connection closed after being open.
    fn on_close(&self, handle: ConnectionHandle);

    /// The connection failed, either before opening or mid-session.
    fn on_fail(&self, handle: ConnectionHandle, error: &Error);

    /// A complete message arrived.
    fn on_message(&self, handle: ConnectionHandle, frame: Frame);
}

// ============================================================================
// PendingConnection
// ============================================================================

/// A connection object created by an engine but not yet queued.
///
/// Carries the destination, the subprotocols to advertise and the handler
/// that will receive this connection's events.
pub struct PendingConnection {
    handle: ConnectionHandle,
    url: Url,
    subprotocols: Vec<String>,
    handler: Option<Arc<dyn EngineHandler>>,
}

impl PendingConnection {
    /// Creates a connection object for an already validated URL.
    #[must_use]
    pub fn new(handle: ConnectionHandle, url: Url) -> Self {
        Self {
            handle,
            url,
            subprotocols: Vec::new(),
            handler: None,
        }
    }

    /// Returns the handle this connection will be known by.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    /// Returns the destination URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Adds a subprotocol to advertise during the handshake.
    pub fn add_subprotocol(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.subprotocols.contains(&name) {
            self.subprotocols.push(name);
        }
    }

    /// Returns the subprotocols to advertise, in preference order.
    #[inline]
    #[must_use]
    pub fn subprotocols(&self) -> &[String] {
        &self.subprotocols
    }

    /// Registers the handler for this connection's events.
    pub fn set_handler(&mut self, handler: Arc<dyn EngineHandler>) {
        self.handler = Some(handler);
    }

    /// Returns `true` if a handler has been registered.
    #[inline]
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Splits the connection into its parts for an engine to consume.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        ConnectionHandle,
        Url,
        Vec<String>,
        Option<Arc<dyn EngineHandler>>,
    ) {
        (self.handle, self.url, self.subprotocols, self.handler)
    }
}

impl fmt::Debug for PendingConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingConnection")
            .field("handle", &self.handle)
            .field("url", &self.url.as_str())
            .field("subprotocols", &self.subprotocols)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// A callback-driven WebSocket networking engine.
///
/// All methods are synchronous and non-blocking with respect to network
/// I/O; outcomes of queued work are reported through [`EngineHandler`].
pub trait Engine: Send + Sync + 'static {
    /// Creates a connection object for `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUri`] or a setup error if the engine cannot
    /// build a connection for this destination.
    fn get_connection(&self, uri: &str) -> Result<PendingConnection>;

    /// Queues a connection attempt. No I/O happens until the loop runs.
    ///
    /// # Errors
    ///
    /// Returns a setup error if the engine cannot accept the attempt.
    fn connect(&self, connection: PendingConnection) -> Result<ConnectionHandle>;

    /// Queues one frame for sending.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownConnection`] if the handle is not live
    /// - [`Error::InvalidState`] if the connection is not open
    fn send(&self, handle: ConnectionHandle, payload: &[u8], opcode: OpCode) -> Result<()>;

    /// Requests a close handshake. Does not wait for it to finish.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownConnection`] if the handle is not live
    /// - [`Error::InvalidState`] if a close is already in progress
    fn close(&self, handle: ConnectionHandle, code: CloseCode, reason: &str) -> Result<()>;
}

// ============================================================================
// URI Validation
// ============================================================================

/// Parses and validates a WebSocket URI.
///
/// Accepts `ws://` and `wss://` URIs with a host.
///
/// # Errors
///
/// Returns [`Error::InvalidUri`] if the URI is malformed, has another
/// scheme, has no host, or carries a fragment.
pub fn parse_uri(uri: &str) -> Result<Url> {
    let url = Url::parse(uri).map_err(|e| Error::invalid_uri(uri, e.to_string()))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(Error::invalid_uri(
                uri,
                format!("unsupported scheme '{other}'"),
            ));
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::invalid_uri(uri, "missing host"));
    }

    if url.fragment().is_some() {
        return Err(Error::invalid_uri(uri, "fragments are not allowed"));
    }

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
