//! Scripted engine for driving handlers deterministically in tests.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::identifiers::{ConnectionHandle, HandleAllocator};

use super::{CloseCode, Engine, EngineHandler, Frame, OpCode, PendingConnection, parse_uri};

/// One connection known to the mock.
struct MockLink {
    handler: Arc<dyn EngineHandler>,
    subprotocols: Vec<String>,
    open: bool,
    done: bool,
}

#[derive(Default)]
struct MockInner {
    links: FxHashMap<ConnectionHandle, MockLink>,
    sent: Vec<(ConnectionHandle, OpCode, Vec<u8>)>,
    closes: Vec<(ConnectionHandle, CloseCode, String)>,
    get_connection_calls: usize,
}

/// Engine that performs no I/O; tests fire events by hand.
#[derive(Default)]
pub(crate) struct MockEngine {
    handles: HandleAllocator,
    inner: Mutex<MockInner>,
    /// Fire `on_open` synchronously from `connect`.
    auto_open: bool,
    /// Make `connect` itself fail.
    reject_connect: bool,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn auto_open() -> Self {
        Self {
            auto_open: true,
            ..Self::default()
        }
    }

    pub(crate) fn rejecting_connect() -> Self {
        Self {
            reject_connect: true,
            ..Self::default()
        }
    }

    fn handler(&self, handle: ConnectionHandle) -> Arc<dyn EngineHandler> {
        let inner = self.inner.lock();
        let link = inner.links.get(&handle).expect("unknown mock connection");
        Arc::clone(&link.handler)
    }

    pub(crate) fn fire_open(&self, handle: ConnectionHandle) {
        if let Some(link) = self.inner.lock().links.get_mut(&handle) {
            link.open = true;
        }
        self.handler(handle).on_open(handle);
    }

    pub(crate) fn fire_close(&self, handle: ConnectionHandle) {
        if let Some(link) = self.inner.lock().links.get_mut(&handle) {
            link.done = true;
        }
        self.handler(handle).on_close(handle);
    }

    pub(crate) fn fire_fail(&self, handle: ConnectionHandle, message: &str) {
        if let Some(link) = self.inner.lock().links.get_mut(&handle) {
            link.done = true;
        }
        self.handler(handle)
            .on_fail(handle, &Error::invalid_state(message.to_string()));
    }

    pub(crate) fn fire_message(&self, handle: ConnectionHandle, frame: Frame) {
        self.handler(handle).on_message(handle, frame);
    }

    /// Returns the single queued connection.
    pub(crate) fn only_handle(&self) -> ConnectionHandle {
        let inner = self.inner.lock();
        assert_eq!(inner.links.len(), 1, "expected exactly one connection");
        *inner.links.keys().next().expect("one connection")
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.inner.lock().links.len()
    }

    pub(crate) fn get_connection_calls(&self) -> usize {
        self.inner.lock().get_connection_calls
    }

    pub(crate) fn subprotocols(&self, handle: ConnectionHandle) -> Vec<String> {
        self.inner.lock().links[&handle].subprotocols.clone()
    }

    pub(crate) fn sent(&self) -> Vec<(ConnectionHandle, OpCode, Vec<u8>)> {
        self.inner.lock().sent.clone()
    }

    pub(crate) fn closes(&self) -> Vec<(ConnectionHandle, CloseCode, String)> {
        self.inner.lock().closes.clone()
    }
}

impl Engine for MockEngine {
    fn get_connection(&self, uri: &str) -> Result<PendingConnection> {
        self.inner.lock().get_connection_calls += 1;
        let url = parse_uri(uri)?;
        Ok(PendingConnection::new(self.handles.allocate(), url))
    }

    fn connect(&self, connection: PendingConnection) -> Result<ConnectionHandle> {
        if self.reject_connect {
            return Err(Error::setup("mock engine refused the connection"));
        }

        let (handle, _url, subprotocols, handler) = connection.into_parts();
        let handler = handler.ok_or_else(|| Error::setup("no handler registered"))?;
        self.inner.lock().links.insert(
            handle,
            MockLink {
                handler,
                subprotocols,
                open: false,
                done: false,
            },
        );

        if self.auto_open {
            self.fire_open(handle);
        }
        Ok(handle)
    }

    fn send(&self, handle: ConnectionHandle, payload: &[u8], opcode: OpCode) -> Result<()> {
        let mut inner = self.inner.lock();
        let link = inner
            .links
            .get(&handle)
            .ok_or_else(|| Error::unknown_connection(handle))?;
        if !link.open || link.done {
            return Err(Error::invalid_state(format!("{handle} is not open")));
        }
        inner.sent.push((handle, opcode, payload.to_vec()));
        Ok(())
    }

    fn close(&self, handle: ConnectionHandle, code: CloseCode, reason: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let link = inner
            .links
            .get(&handle)
            .ok_or_else(|| Error::unknown_connection(handle))?;
        if link.done {
            return Err(Error::invalid_state(format!("{handle} is already done")));
        }
        inner.closes.push((handle, code, reason.to_string()));
        Ok(())
    }
}
