//! The outward-facing WebSocket transport.
//!
//! [`WebSocketTransport`] gives a session layer a synchronous surface
//! (`connect`, `write`, `close`, state queries) over a callback-driven
//! [`Engine`]. Connect outcomes travel back through a [`ConnectFuture`].
//!
//! # Lifecycle
//!
//! 1. `WebSocketTransport::new` - Construct over an engine
//! 2. `set_message_handler` - Attach the receive callback
//! 3. `connect` - Queue the attempt; await the returned future
//! 4. `write` / `close` - Delegate to the engine's connection handle
//! 5. Drop - Cancels a pending attempt, closes a live connection

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace, warn};

use crate::engine::{CloseCode, Engine, EngineHandler, OpCode};
use crate::error::{ConnectFailure, Error, Result};
use crate::identifiers::ConnectionHandle;

use super::bridge::{HandlerBridge, MessageHandler};
use super::config::TransportConfig;
use super::signal::ConnectFuture;
use super::state::Phase;

// ============================================================================
// WebSocketTransport
// ============================================================================

/// WebSocket transport for a WAMP session.
///
/// One transport carries one connect attempt; reconnecting means building a
/// new transport.
///
/// # Thread Safety
///
/// `WebSocketTransport` is `Send + Sync`. Engine callbacks run on the
/// engine's event-loop thread; every method here may be called from any
/// application thread.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use wamp_ws_transport::{EngineConfig, TungsteniteEngine, WebSocketTransport};
///
/// let engine = Arc::new(TungsteniteEngine::new(EngineConfig::default())?);
/// let transport = WebSocketTransport::new(engine);
/// transport.set_message_handler(|payload| println!("{} bytes", payload.len()));
///
/// transport.connect("ws://127.0.0.1:8080/ws").wait()?;
/// transport.write(&[0x91, 0x01])?;
/// transport.close()?;
/// ```
pub struct WebSocketTransport<E: Engine> {
    engine: Arc<E>,
    config: TransportConfig,
    bridge: Arc<HandlerBridge>,
    /// Written once per attempt, before the engine can run it.
    handle: OnceLock<ConnectionHandle>,
}

// ============================================================================
// WebSocketTransport - Constructor
// ============================================================================

impl<E: Engine> WebSocketTransport<E> {
    /// Creates a transport with the default configuration.
    #[must_use]
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            config: TransportConfig::default(),
            bridge: Arc::new(HandlerBridge::new()),
            handle: OnceLock::new(),
        }
    }

    /// Creates a transport with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_config(engine: Arc<E>, config: TransportConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            engine,
            config,
            bridge: Arc::new(HandlerBridge::new()),
            handle: OnceLock::new(),
        })
    }
}

// ============================================================================
// WebSocketTransport - I/O Surface
// ============================================================================

impl<E: Engine> WebSocketTransport<E> {
    /// Queues a connection to `uri` and returns its outcome future.
    ///
    /// Returns without performing network I/O. The future resolves when the
    /// engine reports open or fail, or immediately if the engine rejects the
    /// connection object.
    ///
    /// Failures surface through the future:
    ///
    /// - [`ConnectFailure::Setup`] for a malformed URI or rejected connection
    /// - [`ConnectFailure::Failed`] if the engine reports failure
    /// - [`ConnectFailure::AlreadyStarted`] on a second call
    /// - [`ConnectFailure::Cancelled`] if the transport is dropped first
    pub fn connect(&self, uri: &str) -> ConnectFuture {
        if !self.bridge.state.begin() {
            warn!(uri, "Connect called on a transport that already started");
            return ConnectFuture::ready(Err(ConnectFailure::AlreadyStarted));
        }

        let future = self.bridge.signal.arm();

        let mut connection = match self.engine.get_connection(uri) {
            Ok(connection) => connection,
            Err(error) => {
                self.fail_setup(&error);
                return future;
            }
        };

        connection.add_subprotocol(self.config.subprotocol.clone());
        connection.set_handler(Arc::clone(&self.bridge) as Arc<dyn EngineHandler>);

        let handle = connection.handle();
        let url = connection.url().to_string();
        let _ = self.handle.set(handle);

        if let Err(error) = self.engine.connect(connection) {
            self.fail_setup(&error);
            return future;
        }

        debug!(%handle, %url, subprotocol = %self.config.subprotocol, "Connect queued");
        future
    }

    /// Sends `payload` as one binary frame.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] before `connect`, or if the engine reports
    ///   the connection is not open
    /// - [`Error::UnknownConnection`] after the connection has ended
    pub fn write(&self, payload: &[u8]) -> Result<()> {
        let handle = self.require_handle("write")?;
        self.engine.send(handle, payload, OpCode::Binary)?;

        trace!(%handle, len = payload.len(), "Binary frame written");
        Ok(())
    }

    /// Requests a normal-status close. Does not wait for it to complete.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] before `connect` or if already closing
    /// - [`Error::UnknownConnection`] after the connection has ended
    pub fn close(&self) -> Result<()> {
        let handle = self.require_handle("close")?;
        self.engine
            .close(handle, CloseCode::NORMAL, &self.config.close_reason)?;

        debug!(%handle, "Close requested");
        Ok(())
    }

    fn require_handle(&self, operation: &str) -> Result<ConnectionHandle> {
        self.handle
            .get()
            .copied()
            .ok_or_else(|| Error::invalid_state(format!("{operation} before connect")))
    }

    fn fail_setup(&self, error: &Error) {
        warn!(%error, "Connection setup failed");

        let failure = match error {
            Error::Connect(failure) => failure.clone(),
            other => ConnectFailure::Setup {
                message: other.to_string(),
            },
        };
        self.bridge.signal.fail(failure);
        self.bridge.state.mark_done();
    }
}

// ============================================================================
// WebSocketTransport - State
// ============================================================================

impl<E: Engine> WebSocketTransport<E> {
    /// Returns `true` once the connection has opened.
    ///
    /// Stays `true` after the connection closes or fails; use
    /// [`is_connected`](Self::is_connected) for "usable right now".
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.bridge.state.is_open()
    }

    /// Returns `true` once the connection has closed or failed.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.bridge.state.is_done()
    }

    /// Returns `true` only while open and not yet closed or failed.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.bridge.state.is_connected()
    }

    /// Returns the current lifecycle phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.bridge.state.phase()
    }

    /// Returns the transport configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn handle(&self) -> Option<ConnectionHandle> {
        self.handle.get().copied()
    }
}

// ============================================================================
// WebSocketTransport - Message Handler
// ============================================================================

impl<E: Engine> WebSocketTransport<E> {
    /// Sets the callback receiving inbound binary payloads.
    ///
    /// Called on the engine's event-loop thread; slow work should be handed
    /// off. Replaces any previous handler.
    pub fn set_message_handler<F>(&self, handler: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.bridge.set_receiver(Arc::new(handler) as MessageHandler);
    }

    /// Removes the message handler. Later binary frames are dropped.
    pub fn clear_message_handler(&self) {
        self.bridge.clear_receiver();
    }

    /// Returns `true` if a message handler is attached.
    #[inline]
    #[must_use]
    pub fn has_message_handler(&self) -> bool {
        self.bridge.has_receiver()
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl<E: Engine> fmt::Debug for WebSocketTransport<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("phase", &self.phase())
            .field("handle", &self.handle.get())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: Engine> Drop for WebSocketTransport<E> {
    fn drop(&mut self) {
        if self.bridge.signal.fail(ConnectFailure::Cancelled) {
            debug!("Pending connect cancelled on teardown");
        }

        if !self.bridge.state.is_done()
            && let Some(&handle) = self.handle.get()
            && let Err(error) =
                self.engine
                    .close(handle, CloseCode::GOING_AWAY, &self.config.close_reason)
        {
            debug!(%handle, %error, "Close on teardown failed");
        }

        self.bridge.clear_receiver();
    }
}

// ============================================================================
// Tests
// ============================================================================
