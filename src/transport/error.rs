//! Segment decoding errors.

use thiserror::Error;

/// Errors raised while encoding or decoding a segment.
///
/// Every variant describes a datagram the protocol discards. None of them
/// is fatal to a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SegmentError {
    /// Datagram shorter than its header or its declared length.
    #[error("truncated segment: declared {declared} bytes, received {actual}")]
    Truncated {
        /// Bytes the header claims (or the minimum header size).
        declared: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// Datagram longer than its declared length.
    #[error("trailing bytes: declared {declared} bytes, received {actual}")]
    TrailingBytes {
        /// Bytes the header claims.
        declared: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// Declared length matches neither segment kind.
    #[error("invalid segment length: {0}")]
    InvalidLength(u16),

    /// Checksum over the declared bytes does not verify.
    #[error("checksum mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    ChecksumMismatch {
        /// Value carried in the header.
        expected: u16,
        /// Value computed over the received bytes.
        computed: u16,
    },

    /// Payload exceeds the permitted size.
    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge {
        /// Offered payload length.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },
}

impl SegmentError {
    /// Whether the datagram was damaged in transit rather than malformed
    /// by its sender.
    pub fn is_corruption(&self) -> bool {
        matches!(self, SegmentError::ChecksumMismatch { .. })
    }
}
