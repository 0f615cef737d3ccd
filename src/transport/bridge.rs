//! Engine callbacks translated into state transitions and signal resolution.
//!
//! Every method here runs on the engine's event-loop thread and must return
//! quickly. The state lock is never held while calling the message handler.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::engine::{EngineHandler, Frame};
use crate::error::{ConnectFailure, Error};
use crate::identifiers::ConnectionHandle;

use super::signal::CompletionSignal;
use super::state::ConnectionState;

// ============================================================================
// Types
// ============================================================================

/// Upper-layer receive callback for inbound binary payloads.
///
/// Invoked synchronously on the engine's event-loop thread.
pub type MessageHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

// ============================================================================
// HandlerBridge
// ============================================================================

/// Shared between a transport and the engine's connection.
#[derive(Default)]
pub(crate) struct HandlerBridge {
    pub(crate) state: ConnectionState,
    pub(crate) signal: CompletionSignal,
    receiver: RwLock<Option<MessageHandler>>,
}

impl HandlerBridge {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_receiver(&self, handler: MessageHandler) {
        *self.receiver.write() = Some(handler);
    }

    pub(crate) fn clear_receiver(&self) {
        *self.receiver.write() = None;
    }

    pub(crate) fn has_receiver(&self) -> bool {
        self.receiver.read().is_some()
    }
}

impl EngineHandler for HandlerBridge {
    fn on_open(&self, handle: ConnectionHandle) {
        if self.state.mark_open() {
            debug!(%handle, "Transport open");
        }
        self.signal.succeed();
    }

    fn on_close(&self, handle: ConnectionHandle) {
        // The engine reports fail for attempts that never open, but a close
        // must not leave the caller waiting either.
        if !self.state.is_open() {
            self.signal.fail(ConnectFailure::Failed {
                message: format!("{handle} closed before opening"),
            });
        }
        if self.state.mark_done() {
            debug!(%handle, "Transport closed");
        }
    }

    fn on_fail(&self, handle: ConnectionHandle, error: &Error) {
        if !self.state.is_open() {
            let failure = match error {
                Error::Connect(failure) => failure.clone(),
                other => ConnectFailure::Failed {
                    message: other.to_string(),
                },
            };
            self.signal.fail(failure);
        }
        if self.state.mark_done() {
            warn!(%handle, %error, "Transport failed");
        }
    }

    fn on_message(&self, handle: ConnectionHandle, frame: Frame) {
        if !frame.is_binary() {
            trace!(%handle, opcode = ?frame.opcode, len = frame.len(), "Dropping non-binary frame");
            return;
        }

        let receiver = self.receiver.read().clone();
        match receiver {
            Some(receiver) => receiver(&frame.payload),
            None => warn!(%handle, len = frame.len(), "Binary frame dropped, no handler attached"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    use crate::engine::OpCode;

    fn recording_bridge() -> (HandlerBridge, Arc<Mutex<Vec<Vec<u8>>>>) {
        let bridge = HandlerBridge::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        bridge.set_receiver(Arc::new(move |payload: &[u8]| {
            sink.lock().push(payload.to_vec());
        }));
        (bridge, received)
    }

    #[test]
    fn test_open_resolves_success() {
        let bridge = HandlerBridge::new();
        let future = bridge.signal.arm();

        bridge.on_open(ConnectionHandle::new(1));

        assert!(bridge.state.is_connected());
        assert!(future.wait().is_ok());
    }

    #[test]
    fn test_fail_before_open_resolves_failure() {
        let bridge = HandlerBridge::new();
        let future = bridge.signal.arm();

        bridge.on_fail(ConnectionHandle::new(1), &Error::connect_failed("refused"));

        assert!(!bridge.state.is_open());
        assert!(bridge.state.is_done());
        let err = future.wait().unwrap_err();
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_fail_preserves_cancellation() {
        let bridge = HandlerBridge::new();
        let future = bridge.signal.arm();

        bridge.on_fail(
            ConnectionHandle::new(1),
            &Error::Connect(ConnectFailure::Cancelled),
        );

        let err = future.wait().unwrap_err();
        assert_eq!(err.connect_failure(), Some(&ConnectFailure::Cancelled));
    }

    #[test]
    fn test_fail_after_open_keeps_success() {
        let bridge = HandlerBridge::new();
        let future = bridge.signal.arm();
        let handle = ConnectionHandle::new(1);

        bridge.on_open(handle);
        bridge.on_fail(handle, &Error::ConnectionClosed);

        assert!(future.wait().is_ok());
        assert!(bridge.state.is_open());
        assert!(!bridge.state.is_connected());
    }

    #[test]
    fn test_close_before_open_resolves_failure() {
        let bridge = HandlerBridge::new();
        let future = bridge.signal.arm();

        bridge.on_close(ConnectionHandle::new(3));

        assert!(future.wait().is_err());
        assert!(bridge.state.is_done());
    }

    #[test]
    fn test_binary_frames_forwarded() {
        let (bridge, received) = recording_bridge();
        let handle = ConnectionHandle::new(1);

        bridge.on_message(handle, Frame::binary(vec![1, 2]));
        bridge.on_message(handle, Frame::binary(vec![3]));

        assert_eq!(*received.lock(), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_non_binary_frames_dropped() {
        let (bridge, received) = recording_bridge();
        let handle = ConnectionHandle::new(1);

        bridge.on_message(handle, Frame::text("hello"));
        bridge.on_message(handle, Frame::new(OpCode::Ping, vec![0]));

        assert!(received.lock().is_empty());
    }

    #[test]
    fn test_message_without_receiver_is_dropped() {
        let bridge = HandlerBridge::new();
        assert!(!bridge.has_receiver());
        bridge.on_message(ConnectionHandle::new(1), Frame::binary(vec![1]));
    }

    #[test]
    fn test_receiver_may_reenter_bridge() {
        let bridge = Arc::new(HandlerBridge::new());
        let inner = Arc::clone(&bridge);
        bridge.set_receiver(Arc::new(move |_payload: &[u8]| {
            // Would deadlock if the receiver lock were held during the call.
            inner.clear_receiver();
            assert!(!inner.state.is_done());
        }));

        bridge.on_message(ConnectionHandle::new(1), Frame::binary(vec![1]));
        assert!(!bridge.has_receiver());
    }
}
