//! WebSocket transport layer.
//!
//! This module adapts a callback-driven [`Engine`](crate::engine::Engine)
//! to the synchronous, future-returning surface a WAMP session expects.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐  connect / write / close  ┌────────────────────┐
//! │   Session layer    │──────────────────────────►│ WebSocketTransport │
//! │  (app threads)     │◄──── ConnectFuture ───────│                    │
//! └────────────────────┘                           └─────────┬──────────┘
//!           ▲                                                │ delegates
//!           │ message handler                      ┌─────────▼──────────┐
//!           └──────────────────────────────────────│   HandlerBridge    │
//!                                                  │  state + signal    │
//!                                                  └─────────▲──────────┘
//!                                                            │ on_open / on_close /
//!                                                            │ on_fail / on_message
//!                                                  ┌─────────┴──────────┐
//!                                                  │  Engine I/O thread │
//!                                                  └────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bridge` | Engine callbacks to state transitions and forwarding |
//! | `config` | [`TransportConfig`] and wire constants |
//! | `signal` | [`CompletionSignal`] and [`ConnectFuture`] |
//! | `state` | [`ConnectionState`] and [`Phase`] |
//! | `websocket` | [`WebSocketTransport`] |

// ============================================================================
// Submodules
// ============================================================================

/// Engine callback handlers.
mod bridge;

/// Transport configuration.
pub mod config;

/// Connect completion signal.
pub mod signal;

/// Connection lifecycle flags.
pub mod state;

/// The outward-facing transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::MessageHandler;
pub use config::{DISCONNECT_REASON, TransportConfig, WAMP_MSGPACK_SUBPROTOCOL};
pub use signal::{CompletionSignal, ConnectFuture, ConnectOutcome};
pub use state::{ConnectionState, Phase};
pub use websocket::WebSocketTransport;
