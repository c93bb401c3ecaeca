//! # relstream
//!
//! A reliable byte-stream protocol over an unreliable datagram transport.
//!
//! Datagrams may be dropped, reordered, duplicated or corrupted in transit.
//! relstream still delivers each direction of a stream in order, exactly
//! once and checksum-verified, followed by an end-of-stream signal. It
//! provides:
//!
//! - **Wire codec**: Data and Ack segments with a 16-bit one's-complement
//!   checksum
//! - **Sliding window**: up to W outstanding segments, fixed-timeout
//!   retransmission, cumulative acknowledgments
//! - **Flow control**: the receiver never acknowledges data its sink has not
//!   accepted
//! - **Teardown**: each side sends an empty Data segment, and a session closes
//!   only once both have been acknowledged
//! - **Multiplexing**: a Session Table serves many peers from one socket
//!
//! ## Feature Flags
//!
//! - `net`: tokio UDP transport and channel pipes
//! - `client` (default): single-session async driver
//! - `server` (default): multiplexed async driver
//! - `cli`: the `relstream` binary
//!
//! ## Modules
//!
//! - [`core`]: configuration, constants, error types and collaborator traits
//! - [`transport`]: segment codec, checksum and retransmission timing
//! - [`stream`]: sender window, receiver and byte pipes
//! - [`session`]: sessions, termination and the Session Table
//! - [`client`] / [`server`]: async drivers (feature-gated)
//!
//! ## Example Usage
//!
//! The engine is sans-I/O. Events carry the current time and a transport to
//! write through, so two sessions can be wired together by hand:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Instant;
//! use relstream::prelude::*;
//!
//! let config = Arc::new(Config::default());
//! let (a_addr, b_addr) = ("127.0.0.1:1000".parse().unwrap(), "127.0.0.1:2000".parse().unwrap());
//! let mut a = Session::new(b_addr, config.clone(), MemorySource::new("HELLO"), MemorySink::new());
//! let mut b = Session::new(a_addr, config, MemorySource::empty(), MemorySink::new());
//! let (mut to_b, mut to_a) = (RecordingTransport::new(), RecordingTransport::new());
//! let now = Instant::now();
//!
//! a.on_source_ready(now, &mut to_b);
//! b.on_source_ready(now, &mut to_a);
//! while !(to_a.sent().is_empty() && to_b.sent().is_empty()) {
//!     for (_, datagram) in to_b.take() {
//!         b.on_datagram(&datagram, now, &mut to_a);
//!     }
//!     for (_, datagram) in to_a.take() {
//!         a.on_datagram(&datagram, now, &mut to_b);
//!     }
//! }
//!
//! assert_eq!(b.sink().contents(), b"HELLO");
//! assert!(a.is_closed() && b.is_closed());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Protocol engine (always included, no I/O)
pub mod session;
pub mod stream;
pub mod transport;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

// Server API (feature-gated)
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    pub use crate::session::{Session, SessionStats, SessionTable, TerminationState};
    pub use crate::stream::{MemorySink, MemorySource};
    pub use crate::transport::{AckSegment, DataSegment, Segment};

    #[cfg(feature = "net")]
    pub use crate::stream::{ChannelSink, ChannelSource};
    #[cfg(feature = "net")]
    pub use crate::transport::UdpTransport;

    #[cfg(feature = "client")]
    pub use crate::client::{Client, ClientBuilder};
    #[cfg(feature = "server")]
    pub use crate::server::{Server, ServerBuilder};
}

// Re-export commonly used items at crate root
pub use crate::core::{Config, ConfigBuilder, Error, Result};
pub use crate::session::{Session, SessionTable};
pub use crate::transport::{decode, encode, Segment};
