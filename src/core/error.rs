//! Error types for relstream.

use thiserror::Error;

pub use crate::transport::SegmentError;

/// Invalid configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Window must allow at least one outstanding segment.
    #[error("window size must be at least 1")]
    ZeroWindow,

    /// Window larger than the protocol allows.
    #[error("window size {window} exceeds maximum {max}")]
    WindowTooLarge {
        /// Requested window.
        window: usize,
        /// Largest permitted window.
        max: usize,
    },

    /// Retransmission timeout must be non-zero.
    #[error("retransmission timeout must be non-zero")]
    ZeroTimeout,

    /// Timer interval must be non-zero.
    #[error("timer interval must be non-zero")]
    ZeroTimerInterval,

    /// Timer ticks slower than the retransmission timeout would miss deadlines.
    #[error("timer interval {timer_ms}ms exceeds retransmission timeout {timeout_ms}ms")]
    TimerSlowerThanTimeout {
        /// Configured timer interval in milliseconds.
        timer_ms: u128,
        /// Configured retransmission timeout in milliseconds.
        timeout_ms: u128,
    },

    /// Payload size outside what the length field can carry.
    #[error("max payload {len} outside 1..={max}")]
    PayloadOutOfRange {
        /// Requested payload size.
        len: usize,
        /// Largest permitted payload size.
        max: usize,
    },
}

/// Errors that end a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A segment hit the configured retransmission bound.
    #[error("segment {seqno} unacknowledged after {attempts} retransmissions")]
    RetransmitLimit {
        /// Sequence number of the abandoned segment.
        seqno: u32,
        /// Retransmissions performed before giving up.
        attempts: u32,
    },

    /// The application stopped consuming before the peer's stream ended.
    #[error("application sink closed before end of stream")]
    SinkClosed,

    /// The session was aborted and accepts no further events.
    #[error("session aborted")]
    Aborted,
}

/// Top-level relstream errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Segment codec error.
    #[error("segment error: {0}")]
    Segment(#[from] SegmentError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for fallible relstream operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::RetransmitLimit { seqno: 7, attempts: 3 };
        assert_eq!(
            err.to_string(),
            "segment 7 unacknowledged after 3 retransmissions"
        );
    }

    #[test]
    fn test_error_from_layers() {
        let err: Error = ConfigError::ZeroWindow.into();
        assert!(matches!(err, Error::Config(ConfigError::ZeroWindow)));

        let err: Error = SegmentError::InvalidLength(9).into();
        assert!(matches!(err, Error::Segment(SegmentError::InvalidLength(9))));
    }
}
