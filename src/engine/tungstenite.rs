//! `tokio-tungstenite` backed networking engine.
//!
//! # Event Loop
//!
//! The engine owns a dedicated I/O thread running a current-thread tokio
//! runtime (or borrows a caller-supplied runtime handle). Each queued
//! connection becomes one task on that runtime which:
//!
//! - Performs the TCP connect and opening handshake (with timeout)
//! - Reports `on_open` / `on_fail` to the connection's handler
//! - Forwards inbound messages to `on_message`
//! - Drains outbound commands queued by [`Engine::send`] / [`Engine::close`]
//! - Reports `on_close` / `on_fail` when the connection ends
//!
//! After a close frame is sent the peer has `close_timeout_ms` to answer;
//! past that the socket is dropped and the connection reported closed.
//!
//! One task per connection keeps that connection's callbacks totally ordered.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::runtime::{Builder, Handle};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{ConnectFailure, Error, Result};
use crate::identifiers::{ConnectionHandle, HandleAllocator};

use super::{
    CloseCode, Engine, EngineConfig, EngineHandler, Frame, OpCode, PendingConnection, parse_uri,
};

// ============================================================================
// Types
// ============================================================================

/// Map of live connections to their command channels.
type LinkMap = FxHashMap<ConnectionHandle, Link>;

/// Commands for a connection task.
enum Command {
    /// Write one message.
    Send(Message),
    /// Start the close handshake.
    Close(CloseFrame),
}

/// Engine-side lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Connecting,
    Open,
    Closing,
}

/// Registry entry for one queued or live connection.
struct Link {
    commands: mpsc::UnboundedSender<Command>,
    state: LinkState,
}

// ============================================================================
// IoThread
// ============================================================================

/// The dedicated event-loop thread owned by an engine.
struct IoThread {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl IoThread {
    fn spawn(name: &str) -> Result<(Self, Handle)> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let handle = runtime.handle().clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                runtime.block_on(async {
                    let _ = shutdown_rx.await;
                });
                debug!("I/O event loop stopped");
            })?;

        Ok((
            Self {
                shutdown_tx: Some(shutdown_tx),
                join: Some(join),
            },
            handle,
        ))
    }
}

impl Drop for IoThread {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(join) = self.join.take() {
            // Joining from the loop thread itself would deadlock.
            if join.thread().id() != thread::current().id() && join.join().is_err() {
                warn!("I/O thread panicked");
            }
        }
    }
}

// ============================================================================
// TungsteniteEngine
// ============================================================================

/// WebSocket client engine built on `tokio-tungstenite`.
///
/// # Thread Safety
///
/// `TungsteniteEngine` is `Send + Sync`. All methods are non-blocking; the
/// engine can be shared by several transports behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// use wamp_ws_transport::{EngineConfig, TungsteniteEngine};
///
/// let engine = TungsteniteEngine::new(EngineConfig::default())?;
/// ```
pub struct TungsteniteEngine {
    config: EngineConfig,
    runtime: Handle,
    handles: HandleAllocator,
    links: Arc<Mutex<LinkMap>>,
    _io_thread: Option<IoThread>,
}

impl TungsteniteEngine {
    /// Creates an engine with its own I/O event-loop thread.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration is invalid
    /// - [`Error::Io`] if the runtime or thread cannot be created
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let (io_thread, runtime) = IoThread::spawn(&config.thread_name)?;

        info!(thread = %config.thread_name, "Engine I/O thread started");

        Ok(Self {
            config,
            runtime,
            handles: HandleAllocator::new(),
            links: Arc::new(Mutex::new(LinkMap::default())),
            _io_thread: Some(io_thread),
        })
    }

    /// Creates an engine that runs its connections on an existing runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_handle(config: EngineConfig, runtime: Handle) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            runtime,
            handles: HandleAllocator::new(),
            links: Arc::new(Mutex::new(LinkMap::default())),
            _io_thread: None,
        })
    }

    /// Returns the engine configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the number of queued or live connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.links.lock().len()
    }

    fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(self.config.max_message_size)
            .max_frame_size(self.config.max_frame_size)
    }
}

// ============================================================================
// Engine Implementation
// ============================================================================

impl Engine for TungsteniteEngine {
    fn get_connection(&self, uri: &str) -> Result<PendingConnection> {
        let url = parse_uri(uri)?;

        if url.scheme() == "wss" {
            return Err(Error::setup(format!(
                "{uri}: TLS is not enabled for this engine"
            )));
        }

        Ok(PendingConnection::new(self.handles.allocate(), url))
    }

    fn connect(&self, connection: PendingConnection) -> Result<ConnectionHandle> {
        let (handle, url, subprotocols, handler) = connection.into_parts();
        let handler =
            handler.ok_or_else(|| Error::setup(format!("{handle}: no handler registered")))?;
        let request = build_request(&url, &subprotocols)?;

        let (commands, command_rx) = mpsc::unbounded_channel();
        {
            let mut links = self.links.lock();
            if links.contains_key(&handle) {
                return Err(Error::setup(format!("{handle} is already queued")));
            }
            links.insert(
                handle,
                Link {
                    commands,
                    state: LinkState::Connecting,
                },
            );
        }

        let task = ConnectionTask {
            handle,
            handler,
            links: Arc::clone(&self.links),
        };
        self.runtime.spawn(task.run(
            request,
            self.websocket_config(),
            self.config.connect_timeout(),
            self.config.close_timeout(),
            command_rx,
        ));

        debug!(%handle, %url, ?subprotocols, "Connection queued");
        Ok(handle)
    }

    fn send(&self, handle: ConnectionHandle, payload: &[u8], opcode: OpCode) -> Result<()> {
        let links = self.links.lock();
        let link = links
            .get(&handle)
            .ok_or_else(|| Error::unknown_connection(handle))?;

        if link.state != LinkState::Open {
            return Err(Error::invalid_state(format!(
                "{handle} is {:?}, cannot send",
                link.state
            )));
        }

        let message = outbound_message(payload, opcode)?;
        link.commands
            .send(Command::Send(message))
            .map_err(|_| Error::ConnectionClosed)?;

        trace!(%handle, len = payload.len(), ?opcode, "Frame queued");
        Ok(())
    }

    fn close(&self, handle: ConnectionHandle, code: CloseCode, reason: &str) -> Result<()> {
        let mut links = self.links.lock();
        let link = links
            .get_mut(&handle)
            .ok_or_else(|| Error::unknown_connection(handle))?;

        if link.state == LinkState::Closing {
            return Err(Error::invalid_state(format!(
                "{handle} is already closing"
            )));
        }

        let frame = CloseFrame {
            code: WsCloseCode::from(code.as_u16()),
            reason: reason.to_string().into(),
        };
        link.commands
            .send(Command::Close(frame))
            .map_err(|_| Error::ConnectionClosed)?;
        link.state = LinkState::Closing;

        debug!(%handle, %code, reason, "Close requested");
        Ok(())
    }
}

// ============================================================================
// ConnectionTask
// ============================================================================

/// Event-loop side of one connection.
struct ConnectionTask {
    handle: ConnectionHandle,
    handler: Arc<dyn EngineHandler>,
    links: Arc<Mutex<LinkMap>>,
}

impl ConnectionTask {
    async fn run(
        self,
        request: Request,
        ws_config: WebSocketConfig,
        connect_timeout: Duration,
        close_timeout: Duration,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let handshake = timeout(
            connect_timeout,
            connect_async_with_config(request, Some(ws_config), true),
        );

        let ws_stream = tokio::select! {
            result = handshake => match result {
                Ok(Ok((stream, response))) => {
                    debug!(
                        handle = %self.handle,
                        status = %response.status(),
                        protocol = ?response.headers().get(SEC_WEBSOCKET_PROTOCOL),
                        "Opening handshake completed"
                    );
                    stream
                }
                Ok(Err(e)) => return self.finish(Err(Error::WebSocket(e))),
                Err(_) => {
                    let timeout_ms = u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX);
                    return self.finish(Err(Error::connection_timeout(timeout_ms)));
                }
            },

            // Only a close can be queued before open.
            _ = commands.recv() => {
                return self.finish(Err(Error::Connect(ConnectFailure::Cancelled)));
            }
        };

        if let Some(link) = self.links.lock().get_mut(&self.handle)
            && link.state == LinkState::Connecting
        {
            link.state = LinkState::Open;
        }
        self.handler.on_open(self.handle);

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut close_deadline: Option<Instant> = None;

        let outcome = loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Close(frame))) => {
                            debug!(handle = %self.handle, ?frame, "Close frame received");
                        }

                        Some(Ok(message)) => {
                            if let Some(frame) = inbound_frame(message) {
                                self.handler.on_message(self.handle, frame);
                            }
                        }

                        Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                            break Ok(());
                        }

                        Some(Err(e)) => break Err(Error::WebSocket(e)),
                    }
                }

                command = commands.recv() => {
                    match command {
                        Some(Command::Send(message)) => {
                            if let Err(e) = ws_write.send(message).await {
                                break Err(Error::WebSocket(e));
                            }
                        }

                        Some(Command::Close(frame)) => {
                            if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                                break Err(Error::WebSocket(e));
                            }
                            close_deadline = Some(Instant::now() + close_timeout);
                        }

                        None => {
                            let _ = ws_write.close().await;
                            break Ok(());
                        }
                    }
                }

                _ = sleep_until(close_deadline.unwrap_or_else(Instant::now)), if close_deadline.is_some() => {
                    warn!(
                        handle = %self.handle,
                        timeout_ms = u64::try_from(close_timeout.as_millis()).unwrap_or(u64::MAX),
                        "Peer did not answer close, dropping socket"
                    );
                    break Ok(());
                }
            }
        };

        drop(ws_write);
        drop(ws_read);
        self.finish(outcome);
    }

    /// Deregisters the connection and reports how it ended.
    fn finish(&self, outcome: Result<()>) {
        self.links.lock().remove(&self.handle);

        match outcome {
            Ok(()) => {
                debug!(handle = %self.handle, "Connection closed");
                self.handler.on_close(self.handle);
            }
            Err(error) => {
                warn!(handle = %self.handle, %error, "Connection failed");
                self.handler.on_fail(self.handle, &error);
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Builds the client handshake request, advertising `subprotocols`.
fn build_request(url: &Url, subprotocols: &[String]) -> Result<Request> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| Error::setup(format!("{url}: {e}")))?;

    if !subprotocols.is_empty() {
        let value = HeaderValue::from_str(&subprotocols.join(", "))
            .map_err(|e| Error::setup(format!("invalid subprotocol: {e}")))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(request)
}

/// Converts a queued payload into a tungstenite message.
fn outbound_message(payload: &[u8], opcode: OpCode) -> Result<Message> {
    match opcode {
        OpCode::Binary => Ok(Message::binary(payload.to_vec())),
        OpCode::Text => {
            let text = String::from_utf8(payload.to_vec())
                .map_err(|_| Error::invalid_state("text frame payload is not UTF-8"))?;
            Ok(Message::text(text))
        }
        OpCode::Ping => Ok(Message::Ping(payload.to_vec().into())),
        OpCode::Pong => Ok(Message::Pong(payload.to_vec().into())),
        OpCode::Close => Err(Error::invalid_state(
            "close frames are sent through Engine::close",
        )),
    }
}

/// Converts an inbound tungstenite message into a [`Frame`].
fn inbound_frame(message: Message) -> Option<Frame> {
    match message {
        Message::Binary(data) => Some(Frame::binary(data.to_vec())),
        Message::Text(text) => Some(Frame::new(OpCode::Text, text.as_str().as_bytes().to_vec())),
        Message::Ping(data) => Some(Frame::new(OpCode::Ping, data.to_vec())),
        Message::Pong(data) => Some(Frame::new(OpCode::Pong, data.to_vec())),
        Message::Close(_) | Message::Frame(_) => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
