//! Transport layer: segment wire format and datagram I/O.
//!
//! - **Checksum**: [`checksum`] computes the 16-bit one's-complement sum
//! - **Segments**: [`Segment`], [`DataSegment`], [`AckSegment`] and their
//!   wire encoding
//! - **Timing**: [`RetransmitPolicy`] for the fixed retransmission timeout
//! - **Sockets**: [`UdpTransport`] wraps a tokio UDP socket (feature `net`)
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     Session (sender / receiver)         │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   segments, checksum, timing            │
//! ├─────────────────────────────────────────┤
//! │              UDP                        │
//! └─────────────────────────────────────────┘
//! ```

mod checksum;
mod error;
mod segment;
#[cfg(feature = "net")]
mod socket;
mod timing;

pub use checksum::checksum;
pub use error::SegmentError;
pub use segment::{decode, encode, AckSegment, DataSegment, Payload, Segment, SegmentKind};
#[cfg(feature = "net")]
pub use socket::UdpTransport;
pub use timing::RetransmitPolicy;
