//! WAMP WebSocket transport - callback engine to future bridge.
//!
//! This library connects a WAMP session layer to a WebSocket networking
//! engine whose events arrive as callbacks on an I/O event-loop thread.
//!
//! # Architecture
//!
//! - **Engine**: owns the event loop, handshake and framing; reports
//!   open/close/fail/message through callbacks
//! - **Transport**: exposes `connect`/`write`/`close` to application
//!   threads and turns engine callbacks into state and a one-shot
//!   [`ConnectFuture`]
//!
//! Key guarantees:
//!
//! - A connect attempt's future resolves exactly once
//! - `is_connected()` holds only between open and close/fail
//! - Binary frames reach the message handler byte-for-byte and in order;
//!   other opcodes are dropped
//! - No retries and no reconnection
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use wamp_ws_transport::{EngineConfig, Result, TungsteniteEngine, WebSocketTransport};
//!
//! fn main() -> Result<()> {
//!     let engine = Arc::new(TungsteniteEngine::new(EngineConfig::default())?);
//!     let transport = WebSocketTransport::new(engine);
//!
//!     transport.set_message_handler(|payload| {
//!         println!("received {} bytes", payload.len());
//!     });
//!
//!     transport.connect("ws://127.0.0.1:8080/ws").wait()?;
//!     transport.write(&[0x93, 0x01, 0xa5, b'r', b'e', b'a', b'l', b'm'])?;
//!     transport.close()?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`engine`] | Engine contract and the `tokio-tungstenite` engine |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe handle wrappers |
//! | [`transport`] | State, completion signal and the transport itself |

// ============================================================================
// Modules
// ============================================================================

/// Callback-driven networking engine contract and implementations.
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for engine entities.
pub mod identifiers;

/// WebSocket transport adapter.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use engine::{
    CloseCode, Engine, EngineConfig, EngineHandler, Frame, OpCode, PendingConnection,
    TungsteniteEngine,
};

// Error types
pub use error::{ConnectFailure, Error, Result};

// Identifier types
pub use identifiers::ConnectionHandle;

// Transport types
pub use transport::{
    ConnectFuture, ConnectionState, DISCONNECT_REASON, MessageHandler, Phase, TransportConfig,
    WAMP_MSGPACK_SUBPROTOCOL, WebSocketTransport,
};
