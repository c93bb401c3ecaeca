//! Stream layer: the two directions of a reliable byte stream.
//!
//! - [`SenderWindow`] turns source bytes into sequenced Data segments and
//!   retransmits them until acknowledged
//! - [`Receiver`] reassembles arriving segments and delivers them to a sink
//!   under backpressure
//! - [`MemorySource`] / [`MemorySink`] and, with the `net` feature,
//!   [`ChannelSource`] / [`ChannelSink`] adapt application I/O

#[cfg(feature = "net")]
mod channel;
mod outstanding;
mod pipe;
mod receiver;
mod sender;

#[cfg(feature = "net")]
pub use channel::{echo_pipe, ChannelSink, ChannelSource};
pub use outstanding::{Outstanding, OutstandingQueue};
pub use pipe::{MemorySink, MemorySource};
pub use receiver::{Disposition, DropReason, Receiver, Reception};
pub use sender::{AckOutcome, SenderWindow};
