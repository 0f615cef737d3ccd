//! One-shot completion signal for a connect attempt.
//!
//! The producer side ([`CompletionSignal`]) lives with the handler bridge and
//! is resolved from the engine's event loop. The consumer side
//! ([`ConnectFuture`]) is handed to whoever called `connect`.
//!
//! Resolution is single-assignment: the sender is taken out of its slot on
//! first use, so later attempts to resolve are no-ops.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::result::Result as StdResult;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use futures_util::future::Shared;
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::{ConnectFailure, Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Stored outcome of one connect attempt.
pub type ConnectOutcome = StdResult<(), ConnectFailure>;

// ============================================================================
// CompletionSignal
// ============================================================================

/// Producer half of a connect attempt's outcome.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    slot: Mutex<Option<oneshot::Sender<ConnectOutcome>>>,
}

impl CompletionSignal {
    /// Creates an unarmed signal.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the signal for a new attempt and returns its future.
    ///
    /// Re-arming drops the previous sender, so an attempt still pending
    /// reads as [`ConnectFailure::Cancelled`].
    pub fn arm(&self) -> ConnectFuture {
        let (tx, rx) = oneshot::channel();
        *self.slot.lock() = Some(tx);
        ConnectFuture::from_receiver(rx)
    }

    /// Resolves the pending attempt. Returns `false` if nothing was pending.
    pub fn resolve(&self, outcome: ConnectOutcome) -> bool {
        let Some(tx) = self.slot.lock().take() else {
            trace!(?outcome, "Completion signal already resolved");
            return false;
        };
        // A dropped receiver still counts as resolved.
        let _ = tx.send(outcome);
        true
    }

    /// Resolves the pending attempt with success.
    #[inline]
    pub fn succeed(&self) -> bool {
        self.resolve(Ok(()))
    }

    /// Resolves the pending attempt with `failure`.
    #[inline]
    pub fn fail(&self, failure: ConnectFailure) -> bool {
        self.resolve(Err(failure))
    }

    /// Returns `true` while an armed attempt awaits resolution.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }
}

// ============================================================================
// ConnectFuture
// ============================================================================

/// Future resolving to the outcome of a connect attempt.
///
/// Clones share the same outcome. A signal dropped without resolution
/// reads as [`ConnectFailure::Cancelled`].
#[derive(Clone)]
#[must_use = "a connect attempt's outcome is only observable through this future"]
pub struct ConnectFuture {
    inner: Shared<oneshot::Receiver<ConnectOutcome>>,
}

impl ConnectFuture {
    fn from_receiver(rx: oneshot::Receiver<ConnectOutcome>) -> Self {
        Self { inner: rx.shared() }
    }

    /// Returns a future that is already resolved with `outcome`.
    pub fn ready(outcome: ConnectOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self::from_receiver(rx)
    }

    /// Returns the outcome if this future (or a clone) has already
    /// observed it.
    #[must_use]
    pub fn peek(&self) -> Option<ConnectOutcome> {
        self.inner.peek().map(|result| flatten(result.clone()))
    }

    /// Blocks the calling thread until the attempt resolves.
    ///
    /// An already-resolved future returns immediately on any thread. A
    /// pending one cannot be waited on from a thread driving a tokio runtime
    /// (including the engine's I/O thread); `.await` it instead.
    ///
    /// # Errors
    ///
    /// - [`Error::Connect`] carrying the attempt's failure
    /// - [`Error::InvalidState`] if pending and called inside a tokio runtime
    /// - [`Error::Io`] if the blocking runtime cannot be created
    pub fn wait(self) -> Result<()> {
        if let Some(outcome) = self.peek() {
            return outcome.map_err(Error::from);
        }
        if Handle::try_current().is_ok() {
            return Err(Error::invalid_state(
                "ConnectFuture::wait called inside a tokio runtime, await it instead",
            ));
        }
        let runtime = Builder::new_current_thread().build()?;
        runtime.block_on(self)
    }
}

impl Future for ConnectFuture {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner
            .poll_unpin(cx)
            .map(|result| flatten(result).map_err(Error::from))
    }
}

impl std::fmt::Debug for ConnectFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectFuture")
            .field("outcome", &self.peek())
            .finish()
    }
}

/// Maps a dropped sender to cancellation.
fn flatten(result: StdResult<ConnectOutcome, oneshot::error::RecvError>) -> ConnectOutcome {
    result.unwrap_or(Err(ConnectFailure::Cancelled))
}

// ============================================================================
// Tests
// ============================================================================
