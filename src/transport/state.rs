//! Connection lifecycle flags shared between the event loop and callers.
//!
//! # State Machine
//!
//! ```text
//! Init ──connect──► Connecting ──on_open──► Open ──on_close/on_fail──► Done
//!                        │                                             ▲
//!                        └──────────────on_fail / setup error──────────┘
//! ```
//!
//! `is_open` latches: once the connection has opened it stays `true`, even
//! after `Done`. Callers that need "usable right now" must ask
//! [`ConnectionState::is_connected`].

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::trace;

// ============================================================================
// Phase
// ============================================================================

/// Coarse lifecycle phase derived from the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Constructed, no connect issued.
    Init,
    /// Connect issued, no outcome yet.
    Connecting,
    /// Opened and not yet done.
    Open,
    /// Closed or failed. Terminal.
    Done,
}

// ============================================================================
// Flags
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    started: bool,
    is_open: bool,
    is_done: bool,
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Lock-protected lifecycle flags.
///
/// Every transition is monotonic; each setter reports whether it changed
/// anything. Critical sections are a single flag read or write.
#[derive(Debug, Default)]
pub struct ConnectionState {
    flags: Mutex<Flags>,
}

impl ConnectionState {
    /// Creates state in the `Init` phase.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `Init` to `Connecting`. Returns `false` if already started.
    pub fn begin(&self) -> bool {
        let mut flags = self.flags.lock();
        if flags.started {
            return false;
        }
        flags.started = true;
        true
    }

    /// Latches `is_open`. Returns `false` if already open or done.
    pub fn mark_open(&self) -> bool {
        let mut flags = self.flags.lock();
        if flags.is_open || flags.is_done {
            trace!(flags = ?*flags, "Ignoring open transition");
            return false;
        }
        flags.is_open = true;
        true
    }

    /// Latches `is_done`. Returns `false` if already done.
    pub fn mark_done(&self) -> bool {
        let mut flags = self.flags.lock();
        if flags.is_done {
            return false;
        }
        flags.is_done = true;
        true
    }

    /// Returns `true` once the connection has opened, including after `Done`.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.flags.lock().is_open
    }

    /// Returns `true` once the connection has closed or failed.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.flags.lock().is_done
    }

    /// Returns `true` only while open and not yet done.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let flags = self.flags.lock();
        flags.is_open && !flags.is_done
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        let flags = *self.flags.lock();
        match (flags.started, flags.is_open, flags.is_done) {
            (_, _, true) => Phase::Done,
            (_, true, false) => Phase::Open,
            (true, false, false) => Phase::Connecting,
            (false, false, false) => Phase::Init,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
