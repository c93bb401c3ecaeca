//! Session termination state machine.
//!
//! ```text
//!            local EOF acked              remote EOF delivered
//!   Open ─────────────────────► LocalDone ─────────────────────┐
//!     │                                                        ▼
//!     └──────────────────────► RemoteDone ─────────────────► Closed
//!            remote EOF delivered          local EOF acked
//! ```
//!
//! No state returns to `Open`, and `Closed` is terminal.

use std::fmt;

/// Termination state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationState {
    /// Both directions still carry data.
    Open,
    /// Our end of stream has been acknowledged; the peer's has not arrived.
    LocalDone,
    /// The peer's end of stream has been delivered; ours is unacknowledged.
    RemoteDone,
    /// Both directions finished.
    Closed,
}

impl TerminationState {
    /// Whether our direction has finished.
    pub fn is_local_done(self) -> bool {
        matches!(self, Self::LocalDone | Self::Closed)
    }

    /// Whether the peer's direction has finished.
    pub fn is_remote_done(self) -> bool {
        matches!(self, Self::RemoteDone | Self::Closed)
    }
}

impl fmt::Display for TerminationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "OPEN",
            Self::LocalDone => "LOCAL_DONE",
            Self::RemoteDone => "REMOTE_DONE",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Tracks the termination conditions of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    state: TerminationState,
}

impl Default for Termination {
    fn default() -> Self {
        Self::new()
    }
}

impl Termination {
    /// Start in `Open`.
    pub fn new() -> Self {
        Self {
            state: TerminationState::Open,
        }
    }

    /// Current state.
    pub fn state(&self) -> TerminationState {
        self.state
    }

    /// Whether the terminal state was reached.
    pub fn is_closed(&self) -> bool {
        self.state == TerminationState::Closed
    }

    /// Fold in the current conditions, returning the previous state if it
    /// changed.
    ///
    /// Conditions already recorded are never forgotten, so a `false` for a
    /// direction that finished earlier has no effect.
    pub fn update(&mut self, local_done: bool, remote_done: bool) -> Option<TerminationState> {
        let local = local_done || self.state.is_local_done();
        let remote = remote_done || self.state.is_remote_done();
        let next = match (local, remote) {
            (false, false) => TerminationState::Open,
            (true, false) => TerminationState::LocalDone,
            (false, true) => TerminationState::RemoteDone,
            (true, true) => TerminationState::Closed,
        };
        if next == self.state {
            return None;
        }
        let previous = self.state;
        self.state = next;
        Some(previous)
    }
}
