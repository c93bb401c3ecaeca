//! Protocol constants.
//!
//! Wire sizes are fixed by the segment format and MUST NOT be changed.
//! Timing values are defaults only; [`Config`](super::Config) overrides them.

use std::time::Duration;

// =============================================================================
// WIRE SIZES
// =============================================================================

/// Checksum field size.
pub const CHECKSUM_SIZE: usize = 2;

/// Declared-length field size.
pub const LENGTH_SIZE: usize = 2;

/// Ack segment header size (checksum + length + ackno).
pub const ACK_HEADER_SIZE: usize = CHECKSUM_SIZE + LENGTH_SIZE + 4;

/// Data segment header size (ack header + seqno).
pub const DATA_HEADER_SIZE: usize = ACK_HEADER_SIZE + 4;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_CAPACITY: usize = u16::MAX as usize - DATA_HEADER_SIZE;

/// Default maximum payload per Data segment.
pub const DEFAULT_MAX_PAYLOAD: usize = 500;

// =============================================================================
// SEQUENCE SPACE
// =============================================================================

/// First sequence number assigned by every sender.
pub const INITIAL_SEQNO: u32 = 1;

/// Highest sequence number a sender may assign. Reserved for end-of-stream,
/// so that its acknowledgment number still fits in 32 bits.
pub const FINAL_SEQNO: u32 = u32::MAX - 1;

// =============================================================================
// TIMING DEFAULTS
// =============================================================================

/// Default window size (stop-and-wait).
pub const DEFAULT_WINDOW: usize = 1;

/// Largest accepted window. Bounds the outstanding queue and the
/// receiver's reorder buffer.
pub const MAX_WINDOW: usize = 4096;

/// Default retransmission timeout.
pub const DEFAULT_RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default timer tick interval (one fifth of the retransmission timeout).
pub const DEFAULT_TIMER_INTERVAL: Duration = Duration::from_millis(400);

/// Receive buffer for a single datagram.
pub const RECV_BUFFER_SIZE: usize = 65535;
